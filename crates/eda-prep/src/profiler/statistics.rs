//! Per-column descriptive statistics and missing-value reporting.

use std::collections::HashMap;

use serde::Serialize;

use crate::cleaner::Deduplicator;
use crate::error::Result;
use crate::frame::NumericValues;
use crate::types::{Cell, Column, Dataset, Role};

/// Number of most frequent values reported for non-numeric columns.
pub const TOP_VALUES_LIMIT: usize = 10;

/// Number of example values listed in a missing-value report entry.
pub const SAMPLE_VALUES_LIMIT: usize = 5;

/// Summary statistics of a numeric column. Missing cells are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1); absent with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Detailed description of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub role: Role,
    pub non_missing_count: usize,
    pub missing_count: usize,
    pub unique_count: usize,
    pub estimated_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
    /// Most frequent values, most common first. Empty for numeric columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_values: Vec<ValueCount>,
}

/// Missing-value facts for one column with at least one missing cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingColumnReport {
    pub column: String,
    pub role: Role,
    pub count: usize,
    pub percentage: f64,
    pub sample_values: Vec<String>,
}

/// Whole-dataset overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub total_missing: usize,
    /// Rows that repeat an earlier row across every column.
    pub duplicate_rows: usize,
    pub estimated_bytes: usize,
    pub role_counts: HashMap<Role, usize>,
}

/// Computes descriptive statistics over a [`Dataset`].
pub struct ColumnStatistics;

impl ColumnStatistics {
    /// Describe a single column by name.
    pub fn column_info(dataset: &Dataset, name: &str) -> Result<ColumnInfo> {
        let column = dataset.column(name)?;
        Ok(Self::describe(column))
    }

    /// Describe every column in order.
    pub fn all_columns(dataset: &Dataset) -> Vec<ColumnInfo> {
        dataset.columns().iter().map(Self::describe).collect()
    }

    pub fn describe(column: &Column) -> ColumnInfo {
        let missing_count = column.missing_count();
        let numeric = match column.role() {
            Role::Numeric => numeric_summary(&NumericValues::from_column(column)),
            _ => None,
        };
        let top_values = match column.role() {
            Role::Numeric => Vec::new(),
            _ => value_counts(column, TOP_VALUES_LIMIT),
        };

        ColumnInfo {
            name: column.name().to_string(),
            role: column.role(),
            non_missing_count: column.len() - missing_count,
            missing_count,
            unique_count: column.distinct_count(),
            estimated_bytes: column.cells().iter().map(Cell::estimated_size).sum(),
            numeric,
            top_values,
        }
    }

    /// Columns that have missing cells, in column order.
    pub fn missing_report(dataset: &Dataset) -> Vec<MissingColumnReport> {
        let rows = dataset.row_count();
        dataset
            .columns()
            .iter()
            .filter_map(|column| {
                let count = column.missing_count();
                if count == 0 {
                    return None;
                }
                Some(MissingColumnReport {
                    column: column.name().to_string(),
                    role: column.role(),
                    count,
                    percentage: percentage(count, rows),
                    sample_values: column
                        .non_missing()
                        .take(SAMPLE_VALUES_LIMIT)
                        .filter_map(Cell::render)
                        .collect(),
                })
            })
            .collect()
    }

    pub fn summary(dataset: &Dataset) -> Result<DatasetSummary> {
        let mut role_counts = HashMap::new();
        for column in dataset.columns() {
            *role_counts.entry(column.role()).or_insert(0) += 1;
        }
        let duplicate_rows = if dataset.column_count() == 0 {
            0
        } else {
            Deduplicator::count_duplicates(dataset, None)?
        };
        Ok(DatasetSummary {
            rows: dataset.row_count(),
            columns: dataset.column_count(),
            total_missing: dataset.total_missing(),
            duplicate_rows,
            estimated_bytes: dataset.estimated_memory_bytes(),
            role_counts,
        })
    }
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn numeric_summary(values: &NumericValues) -> Option<NumericSummary> {
    let std = if values.len() >= 2 { values.std(1) } else { None };

    Some(NumericSummary {
        mean: values.mean()?,
        median: values.median()?,
        std,
        min: values.min()?,
        max: values.max()?,
        q25: values.quantile(0.25)?,
        q75: values.quantile(0.75)?,
    })
}

/// Frequency of each rendered value, most common first. Ties keep first
/// appearance order.
fn value_counts(column: &Column, limit: usize) -> Vec<ValueCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.non_missing().filter_map(Cell::render) {
        let entry = counts.entry(value.clone()).or_insert(0);
        if *entry == 0 {
            order.push(value);
        }
        *entry += 1;
    }

    let mut result: Vec<ValueCount> = order
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or(0);
            ValueCount { value, count }
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result.truncate(limit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "score",
                Role::Numeric,
                vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Missing, Cell::Number(3.0)],
            ),
            Column::new(
                "grade",
                Role::Categorical,
                vec![Cell::text("b"), Cell::text("a"), Cell::text("a"), Cell::Missing],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_numeric_column_info() {
        let info = ColumnStatistics::column_info(&dataset(), "score").unwrap();
        assert_eq!(info.missing_count, 1);
        assert_eq!(info.non_missing_count, 3);
        assert_eq!(info.unique_count, 3);
        let numeric = info.numeric.unwrap();
        assert_eq!(numeric.mean, 2.0);
        assert_eq!(numeric.median, 2.0);
        assert_eq!(numeric.std, Some(1.0));
        assert_eq!(numeric.q25, 1.5);
        assert!(info.top_values.is_empty());
    }

    #[test]
    fn test_categorical_top_values() {
        let info = ColumnStatistics::column_info(&dataset(), "grade").unwrap();
        assert!(info.numeric.is_none());
        assert_eq!(
            info.top_values,
            vec![
                ValueCount { value: "a".into(), count: 2 },
                ValueCount { value: "b".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_missing_report() {
        let report = ColumnStatistics::missing_report(&dataset());
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].column, "score");
        assert_eq!(report[0].percentage, 25.0);
        assert_eq!(report[1].sample_values, vec!["b", "a", "a"]);
    }

    #[test]
    fn test_summary_counts_roles() {
        let summary = ColumnStatistics::summary(&dataset()).unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.total_missing, 2);
        assert_eq!(summary.duplicate_rows, 0);
        assert_eq!(summary.role_counts.get(&Role::Numeric), Some(&1));
    }

    #[test]
    fn test_summary_counts_duplicate_rows() {
        let dataset = Dataset::new(vec![
            Column::new(
                "k",
                Role::Numeric,
                vec![Cell::Number(1.0), Cell::Number(1.0), Cell::Missing, Cell::Missing],
            ),
            Column::new(
                "v",
                Role::Text,
                vec![Cell::text("a"), Cell::text("a"), Cell::Missing, Cell::text("b")],
            ),
        ])
        .unwrap();
        assert_eq!(ColumnStatistics::summary(&dataset).unwrap().duplicate_rows, 1);
    }

    #[test]
    fn test_unknown_column() {
        assert!(ColumnStatistics::column_info(&dataset(), "nope").is_err());
    }
}
