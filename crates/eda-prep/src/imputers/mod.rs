//! Missing-value handling.
//!
//! This module provides:
//! - Row deletion on missing values in the targeted columns
//! - Statistical fills (mean, median, mode) and user constants
//! - Forward and backward propagation

mod propagation;
mod statistical;

pub use propagation::PropagationImputer;
pub use statistical::StatisticalImputer;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::OperationBudget;
use crate::error::Result;
use crate::types::{Cell, Column, Dataset};

/// How missing cells are handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Remove every row with a missing cell in any targeted column.
    DeleteRows,
    Mean,
    Median,
    Mode,
    ForwardFill,
    BackwardFill,
    /// Fill with a user value, parsed according to each column's role.
    Constant { value: String },
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteRows => f.write_str("delete rows"),
            Self::Mean => f.write_str("mean"),
            Self::Median => f.write_str("median"),
            Self::Mode => f.write_str("mode"),
            Self::ForwardFill => f.write_str("forward fill"),
            Self::BackwardFill => f.write_str("backward fill"),
            Self::Constant { value } => write!(f, "constant '{value}'"),
        }
    }
}

/// What happened to one targeted column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFill {
    pub column: String,
    pub filled: usize,
    /// Rendered fill value for strategies that use a single value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<String>,
}

/// Result of an imputation.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    pub dataset: Dataset,
    pub fills: Vec<ColumnFill>,
    pub rows_removed: usize,
}

/// Applies an [`ImputeStrategy`] to one or more columns.
pub struct MissingValueImputer<'a> {
    datetime_formats: &'a [String],
}

impl<'a> MissingValueImputer<'a> {
    pub fn new(datetime_formats: &'a [String]) -> Self {
        Self { datetime_formats }
    }

    /// Check that the strategy can be applied, without touching cell data
    /// beyond parsing constants.
    pub fn validate(&self, dataset: &Dataset, columns: &[String], strategy: &ImputeStrategy) -> Result<()> {
        for name in columns {
            let column = dataset.column(name)?;
            match strategy {
                ImputeStrategy::Mean => {
                    StatisticalImputer::require_numeric(column, "Mean imputation")?
                }
                ImputeStrategy::Median => {
                    StatisticalImputer::require_numeric(column, "Median imputation")?
                }
                ImputeStrategy::Constant { value } => {
                    StatisticalImputer::constant_value(column, value, self.datetime_formats)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply the strategy, producing a new dataset.
    pub fn apply(
        &self,
        dataset: &Dataset,
        columns: &[String],
        strategy: &ImputeStrategy,
        budget: &OperationBudget,
    ) -> Result<ImputationOutcome> {
        self.validate(dataset, columns, strategy)?;

        if *strategy == ImputeStrategy::DeleteRows {
            return self.delete_rows(dataset, columns, budget);
        }

        let mut current = dataset.clone();
        let mut fills = Vec::with_capacity(columns.len());
        for name in columns {
            let column = current.column(name)?;
            let (value, (filled_column, filled)) = match strategy {
                ImputeStrategy::ForwardFill => {
                    (None, PropagationImputer::forward_fill(column, budget)?)
                }
                ImputeStrategy::BackwardFill => {
                    (None, PropagationImputer::backward_fill(column, budget)?)
                }
                _ => {
                    let value = self.fill_value(column, strategy)?;
                    let result = StatisticalImputer::fill(column, &value, budget)?;
                    (value.render(), result)
                }
            };

            debug!(
                "Imputed {} cell(s) in '{}' with {}",
                filled, name, strategy
            );
            current = current.replace_column(filled_column)?;
            fills.push(ColumnFill {
                column: name.clone(),
                filled,
                fill_value: value,
            });
        }

        Ok(ImputationOutcome {
            dataset: current,
            fills,
            rows_removed: 0,
        })
    }

    fn fill_value(&self, column: &Column, strategy: &ImputeStrategy) -> Result<Cell> {
        match strategy {
            ImputeStrategy::Mean => StatisticalImputer::mean_value(column),
            ImputeStrategy::Median => StatisticalImputer::median_value(column),
            ImputeStrategy::Mode => StatisticalImputer::mode_value(column),
            ImputeStrategy::Constant { value } => {
                StatisticalImputer::constant_value(column, value, self.datetime_formats)
            }
            ImputeStrategy::DeleteRows | ImputeStrategy::ForwardFill | ImputeStrategy::BackwardFill => {
                Ok(Cell::Missing)
            }
        }
    }

    fn delete_rows(
        &self,
        dataset: &Dataset,
        columns: &[String],
        budget: &OperationBudget,
    ) -> Result<ImputationOutcome> {
        let targets = columns
            .iter()
            .map(|name| dataset.column(name))
            .collect::<Result<Vec<_>>>()?;

        let mut keep = Vec::with_capacity(dataset.row_count());
        for row in 0..dataset.row_count() {
            budget.tick(row)?;
            keep.push(targets.iter().all(|c| !c.cells()[row].is_missing()));
        }

        let result = dataset.filter_rows(&keep)?;
        let rows_removed = dataset.row_count() - result.row_count();
        debug!("Deleted {} row(s) with missing values", rows_removed);

        Ok(ImputationOutcome {
            dataset: result,
            fills: Vec::new(),
            rows_removed,
        })
    }
}
