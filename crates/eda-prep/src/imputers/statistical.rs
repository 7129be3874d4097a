//! Statistical fill values: mean, median, mode and user constants.

use std::collections::HashMap;

use crate::engine::OperationBudget;
use crate::error::{PrepError, Result};
use crate::frame::NumericValues;
use crate::types::{Cell, Column, Role};
use crate::utils::{parse_bool, parse_datetime, parse_number};

/// Computes fill values and fills missing cells with them.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Arithmetic mean of a numeric column.
    pub fn mean_value(column: &Column) -> Result<Cell> {
        Self::require_numeric(column, "Mean imputation")?;
        NumericValues::from_column(column)
            .mean()
            .map(Cell::number)
            .ok_or_else(|| no_values(column))
    }

    /// Median of a numeric column.
    pub fn median_value(column: &Column) -> Result<Cell> {
        Self::require_numeric(column, "Median imputation")?;
        NumericValues::from_column(column)
            .median()
            .map(Cell::number)
            .ok_or_else(|| no_values(column))
    }

    /// Most frequent value of any column. Ties go to the value seen first.
    pub fn mode_value(column: &Column) -> Result<Cell> {
        let mut counts: HashMap<&Cell, (usize, usize)> = HashMap::new();
        for (position, cell) in column.non_missing().enumerate() {
            counts.entry(cell).or_insert((0, position)).0 += 1;
        }

        counts
            .into_iter()
            .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(cell, _)| cell.clone())
            .ok_or_else(|| no_values(column))
    }

    /// Parse a user-supplied constant according to the column role.
    pub fn constant_value<S: AsRef<str>>(
        column: &Column,
        value: &str,
        datetime_formats: &[S],
    ) -> Result<Cell> {
        let parsed = match column.role() {
            Role::Numeric => parse_number(value).map(Cell::Number),
            Role::Datetime => parse_datetime(value, datetime_formats).map(Cell::DateTime),
            Role::Boolean => parse_bool(value).map(Cell::Boolean),
            Role::Categorical | Role::Text => Some(Cell::text(value)),
        };
        parsed.ok_or_else(|| PrepError::TypeMismatch {
            column: column.name().to_string(),
            role: column.role(),
            value: value.to_string(),
        })
    }

    /// Replace every missing cell with `value`.
    ///
    /// Returns the new column and the number of cells filled.
    pub fn fill(column: &Column, value: &Cell, budget: &OperationBudget) -> Result<(Column, usize)> {
        let mut filled = 0;
        let mut cells = Vec::with_capacity(column.len());
        for (row, cell) in column.cells().iter().enumerate() {
            budget.tick(row)?;
            if cell.is_missing() {
                filled += 1;
                cells.push(value.clone());
            } else {
                cells.push(cell.clone());
            }
        }
        Ok((column.with_cells(cells), filled))
    }

    pub(crate) fn require_numeric(column: &Column, operation: &str) -> Result<()> {
        if column.role() == Role::Numeric {
            Ok(())
        } else {
            Err(PrepError::UnsupportedRole {
                column: column.name().to_string(),
                role: column.role(),
                operation: operation.to_string(),
            })
        }
    }
}

fn no_values(column: &Column) -> PrepError {
    PrepError::InsufficientData {
        column: column.name().to_string(),
        found: 0,
        required: 1,
    }
}
