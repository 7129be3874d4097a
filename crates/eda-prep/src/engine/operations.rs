//! Operation requests and records of applied operations.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::cleaner::KeepPolicy;
use crate::imputers::{ColumnFill, ImputeStrategy};
use crate::outliers::{OutlierBounds, OutlierMethod};
use crate::types::Role;

/// A user request to transform the current dataset.
///
/// Operations serialize with a `kind` tag:
///
/// ```json
/// { "kind": "impute", "columns": ["age"], "strategy": { "method": "median" } }
/// { "kind": "remove_outliers", "column": "price", "method": "iqr" }
/// { "kind": "convert_type", "column": "zip", "target": "text" }
/// { "kind": "drop_duplicates", "keep": "last" }
/// { "kind": "delete_rows", "rows": [0, 7] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Impute {
        columns: Vec<String>,
        strategy: ImputeStrategy,
    },
    RemoveOutliers {
        column: String,
        method: OutlierMethod,
        /// Overrides the configured default threshold for `method`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
    ConvertType {
        column: String,
        target: Role,
        /// Abort instead of coercing unconvertible cells to missing.
        #[serde(default)]
        strict: bool,
    },
    DropDuplicates {
        /// Columns compared for equality; all columns when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subset: Option<Vec<String>>,
        #[serde(default)]
        keep: KeepPolicy,
    },
    DeleteRows {
        /// 0-based row indices into the current dataset.
        rows: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Impute,
    RemoveOutliers,
    ConvertType,
    DropDuplicates,
    DeleteRows,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impute => "impute",
            Self::RemoveOutliers => "remove_outliers",
            Self::ConvertType => "convert_type",
            Self::DropDuplicates => "drop_duplicates",
            Self::DeleteRows => "delete_rows",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Impute { .. } => OperationKind::Impute,
            Self::RemoveOutliers { .. } => OperationKind::RemoveOutliers,
            Self::ConvertType { .. } => OperationKind::ConvertType,
            Self::DropDuplicates { .. } => OperationKind::DropDuplicates,
            Self::DeleteRows { .. } => OperationKind::DeleteRows,
        }
    }

    /// Columns the operation reads or writes by name.
    pub fn target_columns(&self) -> Vec<&str> {
        match self {
            Self::Impute { columns, .. } => columns.iter().map(String::as_str).collect(),
            Self::RemoveOutliers { column, .. } | Self::ConvertType { column, .. } => {
                vec![column.as_str()]
            }
            Self::DropDuplicates { subset, .. } => subset
                .iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            Self::DeleteRows { .. } => Vec::new(),
        }
    }

    /// Short description of the request, without its outcome.
    pub fn describe(&self) -> String {
        match self {
            Self::Impute { columns, strategy } => {
                format!("Impute missing values in {} ({})", quote_list(columns), strategy)
            }
            Self::RemoveOutliers {
                column,
                method,
                threshold,
            } => match threshold {
                Some(t) => format!("Remove {method} outliers from '{column}' (threshold {t})"),
                None => format!("Remove {method} outliers from '{column}'"),
            },
            Self::ConvertType {
                column,
                target,
                strict,
            } => format!(
                "Convert '{column}' to {target}{}",
                if *strict { " (strict)" } else { "" }
            ),
            Self::DropDuplicates { subset, keep } => match subset {
                Some(cols) => format!("Drop duplicates on {} keeping {keep}", quote_list(cols)),
                None => format!("Drop duplicate rows keeping {keep}"),
            },
            Self::DeleteRows { rows } => format!("Delete {} row(s)", rows.len()),
        }
    }
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Kind-specific facts about how an operation turned out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationDetails {
    Impute {
        fills: Vec<ColumnFill>,
        rows_removed: usize,
    },
    RemoveOutliers {
        flagged: usize,
        threshold: f64,
        bounds: Option<OutlierBounds>,
    },
    ConvertType {
        from: Role,
        to: Role,
        /// Cells that could not be converted and became missing.
        failed: usize,
    },
    DropDuplicates {
        removed: usize,
    },
    DeleteRows {
        removed: usize,
    },
}

impl OperationDetails {
    /// One-line outcome used in history summaries.
    pub fn describe(&self) -> String {
        match self {
            Self::Impute {
                fills,
                rows_removed,
            } => {
                if fills.is_empty() {
                    return format!("removed {rows_removed} row(s)");
                }
                fills
                    .iter()
                    .map(|fill| match &fill.fill_value {
                        Some(value) => format!("filled {} in '{}' with {}", fill.filled, fill.column, value),
                        None => format!("filled {} in '{}'", fill.filled, fill.column),
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            }
            Self::RemoveOutliers { flagged, bounds, .. } => match bounds {
                Some(b) => format!(
                    "removed {flagged} outlier row(s) outside [{:.4}, {:.4}]",
                    b.lower, b.upper
                ),
                None => format!("removed {flagged} outlier row(s)"),
            },
            Self::ConvertType { from, to, failed } => {
                if *failed > 0 {
                    format!("{from} -> {to}, {failed} cell(s) could not be converted and are now missing")
                } else {
                    format!("{from} -> {to}")
                }
            }
            Self::DropDuplicates { removed } => format!("removed {removed} duplicate row(s)"),
            Self::DeleteRows { removed } => format!("removed {removed} row(s)"),
        }
    }
}

/// An operation that was successfully applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedOperation {
    pub operation: Operation,
    pub timestamp: DateTime<Local>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub details: OperationDetails,
}

impl AppliedOperation {
    pub fn new(
        operation: Operation,
        rows_before: usize,
        rows_after: usize,
        details: OperationDetails,
    ) -> Self {
        Self {
            operation,
            timestamp: Local::now(),
            rows_before,
            rows_after,
            details,
        }
    }

    /// Signed change in row count.
    pub fn row_delta(&self) -> i64 {
        self.rows_after as i64 - self.rows_before as i64
    }

    /// Human-readable summary: request plus outcome.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.operation.describe(), self.details.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operation_json_round_trip_shape() {
        let json = r#"{"kind":"impute","columns":["age"],"strategy":{"method":"median"}}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(
            op,
            Operation::Impute {
                columns: vec!["age".to_string()],
                strategy: ImputeStrategy::Median,
            }
        );
        assert_eq!(op.kind(), OperationKind::Impute);
    }

    #[test]
    fn test_optional_fields_default() {
        let op: Operation = serde_json::from_str(r#"{"kind":"drop_duplicates"}"#).unwrap();
        assert_eq!(
            op,
            Operation::DropDuplicates {
                subset: None,
                keep: KeepPolicy::First,
            }
        );

        let op: Operation =
            serde_json::from_str(r#"{"kind":"convert_type","column":"a","target":"numeric"}"#)
                .unwrap();
        assert!(matches!(op, Operation::ConvertType { strict: false, .. }));
    }

    #[test]
    fn test_describe() {
        let op = Operation::RemoveOutliers {
            column: "price".to_string(),
            method: OutlierMethod::Iqr,
            threshold: None,
        };
        assert_eq!(op.describe(), "Remove IQR outliers from 'price'");
        assert_eq!(op.target_columns(), vec!["price"]);
    }

    #[test]
    fn test_conversion_summary_mentions_failures() {
        let applied = AppliedOperation::new(
            Operation::ConvertType {
                column: "zip".to_string(),
                target: Role::Numeric,
                strict: false,
            },
            10,
            10,
            OperationDetails::ConvertType {
                from: Role::Text,
                to: Role::Numeric,
                failed: 3,
            },
        );
        assert_eq!(
            applied.summary(),
            "Convert 'zip' to numeric: text -> numeric, 3 cell(s) could not be converted and are now missing"
        );
        assert_eq!(applied.row_delta(), 0);
    }
}
