//! Per-cell type conversion between roles.

use tracing::warn;

use crate::engine::OperationBudget;
use crate::error::{PrepError, Result};
use crate::types::{Cell, Column, Role};
use crate::utils::{parse_bool, parse_datetime, parse_number};

/// Result of converting a column.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub column: Column,
    /// Non-missing cells that could not be converted and became missing.
    pub failed: usize,
}

/// Converts columns to a target role.
///
/// | target | accepted input |
/// |---|---|
/// | Numeric | numeric text, booleans (1/0) |
/// | Datetime | text matching a configured pattern |
/// | Boolean | boolean literals, the numbers 0 and 1 |
/// | Categorical, Text | anything, via its canonical rendering |
pub struct TypeConverter<'a> {
    datetime_formats: &'a [String],
}

impl<'a> TypeConverter<'a> {
    pub fn new(datetime_formats: &'a [String]) -> Self {
        Self { datetime_formats }
    }

    /// Convert `column` to `target`.
    ///
    /// Cells that cannot be converted become missing and are counted. With
    /// `strict` set, any failure aborts with [`PrepError::ConversionError`].
    pub fn convert(
        &self,
        column: &Column,
        target: Role,
        strict: bool,
        budget: &OperationBudget,
    ) -> Result<ConversionOutcome> {
        let mut failed = 0;
        let mut cells = Vec::with_capacity(column.len());
        for (row, cell) in column.cells().iter().enumerate() {
            budget.tick(row)?;
            match self.convert_cell(cell, target) {
                Some(converted) => cells.push(converted),
                None => {
                    failed += 1;
                    cells.push(Cell::Missing);
                }
            }
        }

        if failed > 0 {
            if strict {
                return Err(PrepError::ConversionError {
                    column: column.name().to_string(),
                    target,
                    failed,
                });
            }
            warn!(
                "{} cell(s) of '{}' could not be converted to {} and are now missing",
                failed,
                column.name(),
                target
            );
        }

        Ok(ConversionOutcome {
            column: column.with_role(target, cells),
            failed,
        })
    }

    /// Convert one cell; `None` means the value has no representation in
    /// `target`. Missing cells always convert to missing.
    pub fn convert_cell(&self, cell: &Cell, target: Role) -> Option<Cell> {
        if cell.is_missing() {
            return Some(Cell::Missing);
        }
        match target {
            Role::Numeric => match cell {
                Cell::Number(v) => Some(Cell::Number(*v)),
                Cell::Text(s) => parse_number(s).map(Cell::Number),
                Cell::Boolean(b) => Some(Cell::Number(if *b { 1.0 } else { 0.0 })),
                _ => None,
            },
            Role::Datetime => match cell {
                Cell::DateTime(dt) => Some(Cell::DateTime(*dt)),
                Cell::Text(s) => parse_datetime(s, self.datetime_formats).map(Cell::DateTime),
                _ => None,
            },
            Role::Boolean => match cell {
                Cell::Boolean(b) => Some(Cell::Boolean(*b)),
                Cell::Text(s) => parse_bool(s)
                    .or_else(|| parse_number(s).and_then(number_to_bool))
                    .map(Cell::Boolean),
                Cell::Number(v) => number_to_bool(*v).map(Cell::Boolean),
                _ => None,
            },
            Role::Categorical | Role::Text => cell.render().map(Cell::Text),
        }
    }
}

fn number_to_bool(value: f64) -> Option<bool> {
    if value == 1.0 {
        Some(true)
    } else if value == 0.0 {
        Some(false)
    } else {
        None
    }
}
