//! Validation and execution of a single operation.
//!
//! The executor is pure: it takes a dataset and returns a new one. History
//! bookkeeping happens in [`super::TransformationEngine`].

use std::collections::HashSet;

use tracing::debug;

use super::budget::OperationBudget;
use super::operations::{Operation, OperationDetails};
use crate::cleaner::{Deduplicator, TypeConverter};
use crate::config::EngineConfig;
use crate::error::{PrepError, Result};
use crate::imputers::MissingValueImputer;
use crate::outliers::OutlierDetector;
use crate::types::{Dataset, Role};

/// Runs operations against a dataset.
pub struct OperationExecutor<'a> {
    config: &'a EngineConfig,
}

impl<'a> OperationExecutor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Check that `operation` is legal for `dataset` without running it.
    pub fn validate(&self, dataset: &Dataset, operation: &Operation) -> Result<()> {
        match operation {
            Operation::Impute { columns, strategy } => {
                if columns.is_empty() {
                    return Err(PrepError::InvalidOperation(
                        "imputation needs at least one column".to_string(),
                    ));
                }
                MissingValueImputer::new(&self.config.datetime_formats).validate(
                    dataset,
                    columns,
                    strategy,
                )
            }
            Operation::RemoveOutliers {
                column, threshold, ..
            } => {
                let column = dataset.column(column)?;
                if column.role() != Role::Numeric {
                    return Err(PrepError::UnsupportedRole {
                        column: column.name().to_string(),
                        role: column.role(),
                        operation: "Outlier removal".to_string(),
                    });
                }
                if let Some(t) = threshold
                    && !(t.is_finite() && *t > 0.0)
                {
                    return Err(PrepError::InvalidOperation(format!(
                        "outlier threshold must be positive, got {t}"
                    )));
                }
                Ok(())
            }
            Operation::ConvertType { column, .. } => dataset.column(column).map(|_| ()),
            Operation::DropDuplicates { subset, .. } => {
                if let Some(names) = subset {
                    if names.is_empty() {
                        return Err(PrepError::InvalidOperation(
                            "duplicate subset must name at least one column".to_string(),
                        ));
                    }
                    for name in names {
                        dataset.column(name)?;
                    }
                }
                Ok(())
            }
            Operation::DeleteRows { rows } => {
                if rows.is_empty() {
                    return Err(PrepError::InvalidOperation(
                        "no rows selected for deletion".to_string(),
                    ));
                }
                let row_count = dataset.row_count();
                if let Some(&row) = rows.iter().find(|r| **r >= row_count) {
                    return Err(PrepError::RowOutOfRange {
                        row,
                        rows: row_count,
                    });
                }
                Ok(())
            }
        }
    }

    /// Validate and run `operation`, producing the new dataset and outcome.
    pub fn execute(
        &self,
        dataset: &Dataset,
        operation: &Operation,
        budget: &OperationBudget,
    ) -> Result<(Dataset, OperationDetails)> {
        self.validate(dataset, operation)?;
        budget.check()?;

        let (result, details) = match operation {
            Operation::Impute { columns, strategy } => {
                let outcome = MissingValueImputer::new(&self.config.datetime_formats)
                    .apply(dataset, columns, strategy, budget)?;
                (
                    outcome.dataset,
                    OperationDetails::Impute {
                        fills: outcome.fills,
                        rows_removed: outcome.rows_removed,
                    },
                )
            }
            Operation::RemoveOutliers {
                column,
                method,
                threshold,
            } => {
                let report = OutlierDetector::detect(
                    dataset,
                    column,
                    *method,
                    *threshold,
                    &self.config.outlier,
                    budget,
                )?;
                let keep: Vec<bool> = report.mask.iter().map(|flagged| !flagged).collect();
                (
                    dataset.filter_rows(&keep)?,
                    OperationDetails::RemoveOutliers {
                        flagged: report.outlier_count,
                        threshold: report.threshold,
                        bounds: report.bounds,
                    },
                )
            }
            Operation::ConvertType {
                column,
                target,
                strict,
            } => {
                let source = dataset.column(column)?;
                let outcome = TypeConverter::new(&self.config.datetime_formats)
                    .convert(source, *target, *strict, budget)?;
                (
                    dataset.replace_column(outcome.column)?,
                    OperationDetails::ConvertType {
                        from: source.role(),
                        to: *target,
                        failed: outcome.failed,
                    },
                )
            }
            Operation::DropDuplicates { subset, keep } => {
                let (result, removed) =
                    Deduplicator::drop_duplicates(dataset, subset.as_deref(), *keep, budget)?;
                (result, OperationDetails::DropDuplicates { removed })
            }
            Operation::DeleteRows { rows } => {
                let targets: HashSet<usize> = rows.iter().copied().collect();
                let mut keep = Vec::with_capacity(dataset.row_count());
                for row in 0..dataset.row_count() {
                    budget.tick(row)?;
                    keep.push(!targets.contains(&row));
                }
                (
                    dataset.filter_rows(&keep)?,
                    OperationDetails::DeleteRows {
                        removed: targets.len(),
                    },
                )
            }
        };

        debug!(
            "{} produced {} rows (was {})",
            operation.kind(),
            result.row_count(),
            dataset.row_count()
        );
        Ok((result, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::KeepPolicy;
    use crate::imputers::ImputeStrategy;
    use crate::outliers::OutlierMethod;
    use crate::types::{Cell, Column};

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "x",
                Role::Numeric,
                [1.0, 2.0, 3.0, 4.0, 5.0, 100.0]
                    .iter()
                    .map(|v| Cell::Number(*v))
                    .collect(),
            ),
            Column::new(
                "label",
                Role::Categorical,
                ["a", "b", "a", "b", "a", "b"].iter().map(|v| Cell::text(*v)).collect(),
            ),
        ])
        .unwrap()
    }

    fn run(operation: Operation) -> Result<(Dataset, OperationDetails)> {
        let config = EngineConfig::default();
        OperationExecutor::new(&config).execute(&dataset(), &operation, &OperationBudget::unlimited())
    }

    #[test]
    fn test_remove_outliers_drops_flagged_rows() {
        let (result, details) = run(Operation::RemoveOutliers {
            column: "x".to_string(),
            method: OutlierMethod::Iqr,
            threshold: None,
        })
        .unwrap();
        assert_eq!(result.row_count(), 5);
        assert!(matches!(details, OperationDetails::RemoveOutliers { flagged: 1, .. }));
    }

    #[test]
    fn test_remove_outliers_on_categorical_rejected() {
        let err = run(Operation::RemoveOutliers {
            column: "label".to_string(),
            method: OutlierMethod::ZScore,
            threshold: None,
        })
        .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ROLE");
    }

    #[test]
    fn test_delete_rows_out_of_range() {
        let err = run(Operation::DeleteRows { rows: vec![1, 6] }).unwrap_err();
        assert!(matches!(err, PrepError::RowOutOfRange { row: 6, rows: 6 }));
    }

    #[test]
    fn test_delete_rows_ignores_repeated_indices() {
        let (result, details) = run(Operation::DeleteRows { rows: vec![0, 0, 5] }).unwrap();
        assert_eq!(result.row_count(), 4);
        assert_eq!(details, OperationDetails::DeleteRows { removed: 2 });
    }

    #[test]
    fn test_convert_records_source_role() {
        let (result, details) = run(Operation::ConvertType {
            column: "x".to_string(),
            target: Role::Text,
            strict: true,
        })
        .unwrap();
        assert_eq!(result.column("x").unwrap().role(), Role::Text);
        assert_eq!(
            details,
            OperationDetails::ConvertType {
                from: Role::Numeric,
                to: Role::Text,
                failed: 0,
            }
        );
    }

    #[test]
    fn test_drop_duplicates_on_subset() {
        let (result, details) = run(Operation::DropDuplicates {
            subset: Some(vec!["label".to_string()]),
            keep: KeepPolicy::Last,
        })
        .unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(details, OperationDetails::DropDuplicates { removed: 4 });
        assert_eq!(
            result.column("x").unwrap().cells(),
            &[Cell::Number(5.0), Cell::Number(100.0)]
        );
    }

    #[test]
    fn test_impute_without_columns_rejected() {
        let err = run(Operation::Impute {
            columns: vec![],
            strategy: ImputeStrategy::Mode,
        })
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_OPERATION");
    }

    #[test]
    fn test_cancelled_budget_aborts() {
        let config = EngineConfig::default();
        let token = crate::engine::CancellationToken::new();
        token.cancel();
        let budget = OperationBudget::new(config.timeout(), token);
        let err = OperationExecutor::new(&config)
            .execute(&dataset(), &Operation::DeleteRows { rows: vec![0] }, &budget)
            .unwrap_err();
        assert!(matches!(err, PrepError::Cancelled));
    }
}
