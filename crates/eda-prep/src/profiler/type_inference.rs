//! Role inference and typed-cell construction for columns.

use std::collections::HashSet;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::ingest::RawTable;
use crate::types::{Cell, Column, Dataset, Role};
use crate::utils::{parse_bool, parse_datetime, parse_number};

/// Assigns a [`Role`] to each column and converts its cells to match.
///
/// Rules are checked in order against non-missing cells, first match wins:
///
/// 1. every value is a datetime or parses with a configured pattern: Datetime
/// 2. at most `categorical_threshold` distinct values, and no more than half
///    the row count: Categorical
/// 3. every value is a boolean literal, at most two distinct: Boolean
/// 4. every value is a finite number: Numeric
/// 5. otherwise Text
///
/// A column without any value is Text.
#[derive(Debug, Clone)]
pub struct TypeInferencer<'a> {
    categorical_threshold: usize,
    datetime_formats: &'a [String],
}

impl<'a> TypeInferencer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            categorical_threshold: config.categorical_threshold,
            datetime_formats: &config.datetime_formats,
        }
    }

    /// Infer the role of a column from its cells.
    pub fn infer_role(&self, cells: &[Cell]) -> Role {
        let values: Vec<&Cell> = cells.iter().filter(|c| !c.is_missing()).collect();
        if values.is_empty() {
            return Role::Text;
        }

        if values.iter().all(|c| self.datetime_value(c).is_some()) {
            return Role::Datetime;
        }

        let distinct = values.iter().copied().collect::<HashSet<_>>().len();
        if distinct <= self.categorical_threshold && distinct * 2 <= cells.len() {
            return Role::Categorical;
        }

        if distinct <= 2 && values.iter().all(|c| boolean_value(c).is_some()) {
            return Role::Boolean;
        }

        if values.iter().all(|c| numeric_value(c).is_some()) {
            return Role::Numeric;
        }

        Role::Text
    }

    /// Convert cells into the physical kind `role` stores.
    ///
    /// Cells that do not parse become missing; inference only assigns a role
    /// when every value parses, so this is lossless for inferred roles.
    pub fn coerce_cells(&self, cells: &[Cell], role: Role) -> Vec<Cell> {
        cells
            .iter()
            .map(|cell| {
                if cell.is_missing() {
                    return Cell::Missing;
                }
                match role {
                    Role::Datetime => self
                        .datetime_value(cell)
                        .map(Cell::DateTime)
                        .unwrap_or(Cell::Missing),
                    Role::Boolean => boolean_value(cell).map(Cell::Boolean).unwrap_or(Cell::Missing),
                    Role::Numeric => numeric_value(cell).map(Cell::number).unwrap_or(Cell::Missing),
                    Role::Categorical | Role::Text => match cell {
                        Cell::Text(_) => cell.clone(),
                        other => other.render().map(Cell::Text).unwrap_or(Cell::Missing),
                    },
                }
            })
            .collect()
    }

    /// Infer and type a single column.
    pub fn infer_column(&self, name: impl Into<String>, cells: &[Cell]) -> Column {
        let name = name.into();
        let role = self.infer_role(cells);
        debug!("Column '{}' inferred as {}", name, role);
        Column::new(name, role, self.coerce_cells(cells, role))
    }

    /// Type every column of a freshly ingested table.
    pub fn infer_dataset(&self, table: RawTable) -> Result<Dataset> {
        let columns = table
            .into_columns()
            .map(|(name, cells)| self.infer_column(name, &cells))
            .collect();
        Dataset::new(columns)
    }

    /// Re-run inference on an already typed dataset.
    pub fn reinfer_roles(&self, dataset: &Dataset) -> Result<Dataset> {
        let columns = dataset
            .columns()
            .iter()
            .map(|column| self.infer_column(column.name(), column.cells()))
            .collect();
        Dataset::new(columns)
    }

    fn datetime_value(&self, cell: &Cell) -> Option<chrono::NaiveDateTime> {
        match cell {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => parse_datetime(s, self.datetime_formats),
            _ => None,
        }
    }
}

fn boolean_value(cell: &Cell) -> Option<bool> {
    match cell {
        Cell::Boolean(b) => Some(*b),
        Cell::Text(s) => parse_bool(s),
        _ => None,
    }
}

fn numeric_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => parse_number(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::text(*v)).collect()
    }

    #[test]
    fn test_low_cardinality_strings_are_categorical() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        let cells = text_cells(&["A", "B", "A", "C", "B", "A"]);
        assert_eq!(inferencer.infer_role(&cells), Role::Categorical);
    }

    #[test]
    fn test_cardinality_above_half_the_rows_is_not_categorical() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        assert_eq!(
            inferencer.infer_role(&text_cells(&["10", "20", "10", "30", "40", "50"])),
            Role::Numeric
        );
        assert_eq!(
            inferencer.infer_role(&text_cells(&["a", "b", "c", "d", "a"])),
            Role::Text
        );
    }

    #[test]
    fn test_missing_cells_count_toward_row_count() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        let cells = vec![Cell::text("x"), Cell::text("y"), Cell::Missing, Cell::Missing];
        assert_eq!(inferencer.infer_role(&cells), Role::Categorical);
    }

    #[test]
    fn test_many_distinct_floats_are_numeric() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        let values: Vec<String> = (0..50).map(|i| format!("{:.1}", 1.0 + i as f64 * 1.3)).collect();
        let cells: Vec<Cell> = values.iter().map(|v| Cell::text(v.as_str())).collect();
        assert_eq!(inferencer.infer_role(&cells), Role::Numeric);
    }

    #[test]
    fn test_dates_win_over_categorical() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        let cells = text_cells(&["2024-01-01", "2024-01-01", "2024/02/03 10:00:00"]);
        assert_eq!(inferencer.infer_role(&cells), Role::Datetime);
    }

    #[test]
    fn test_short_boolean_columns_are_boolean() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        assert_eq!(inferencer.infer_role(&text_cells(&["yes", "No"])), Role::Boolean);
        assert_eq!(
            inferencer.infer_role(&text_cells(&["true", "false", "true"])),
            Role::Boolean
        );
        assert_eq!(
            inferencer.infer_role(&text_cells(&["yes", "no", "yes", "no"])),
            Role::Categorical
        );
    }

    #[test]
    fn test_unique_strings_are_text() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        assert_eq!(inferencer.infer_role(&text_cells(&["a", "b", "c"])), Role::Text);
        assert_eq!(inferencer.infer_role(&[Cell::Missing, Cell::Missing]), Role::Text);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let config = EngineConfig::builder().categorical_threshold(1).build().unwrap();
        let inferencer = TypeInferencer::new(&config);
        assert_eq!(inferencer.infer_role(&text_cells(&["A", "B", "A"])), Role::Text);
    }

    #[test]
    fn test_coerced_cells_match_role() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        let column = inferencer.infer_column(
            "price",
            &[Cell::text("1,200"), Cell::Missing, Cell::text("3.5"), Cell::text("7")],
        );
        assert_eq!(column.role(), Role::Numeric);
        assert_eq!(
            column.cells(),
            &[Cell::Number(1200.0), Cell::Missing, Cell::Number(3.5), Cell::Number(7.0)]
        );
    }

    #[test]
    fn test_reinfer_is_idempotent() {
        let config = EngineConfig::default();
        let inferencer = TypeInferencer::new(&config);
        let table = RawTable::from_rows(
            vec!["d".into(), "c".into(), "n".into(), "b".into()],
            vec![
                text_cells(&["2024-01-01", "x", "1.5", "true"]),
                text_cells(&["2024-01-02", "y", "2.5", "false"]),
                text_cells(&["2024-01-02", "x", "9", "true"]),
            ],
        )
        .unwrap();
        let typed = inferencer.infer_dataset(table).unwrap();
        let again = inferencer.reinfer_roles(&typed).unwrap();
        assert_eq!(typed, again);
        assert_eq!(inferencer.reinfer_roles(&again).unwrap(), again);
    }
}
