//! Forward and backward fill.

use polars::prelude::FillNullStrategy;

use crate::engine::OperationBudget;
use crate::error::Result;
use crate::frame::fill_sources;
use crate::types::{Cell, Column};

/// Propagates neighbouring values into missing cells.
///
/// Runs that have no value to propagate from (leading runs for forward fill,
/// trailing runs for backward fill) stay missing.
pub struct PropagationImputer;

impl PropagationImputer {
    /// Fill each missing cell with the nearest preceding value.
    pub fn forward_fill(column: &Column, budget: &OperationBudget) -> Result<(Column, usize)> {
        propagate(column, FillNullStrategy::Forward(None), budget)
    }

    /// Fill each missing cell with the nearest following value.
    pub fn backward_fill(column: &Column, budget: &OperationBudget) -> Result<(Column, usize)> {
        propagate(column, FillNullStrategy::Backward(None), budget)
    }
}

fn propagate(
    column: &Column,
    strategy: FillNullStrategy,
    budget: &OperationBudget,
) -> Result<(Column, usize)> {
    budget.check()?;
    let sources = fill_sources(column, strategy)?;

    let cells = column.cells();
    let mut out = Vec::with_capacity(cells.len());
    let mut filled = 0;
    for (row, (cell, source)) in cells.iter().zip(sources).enumerate() {
        budget.tick(row)?;
        match source {
            Some(source) if cell.is_missing() => {
                filled += 1;
                out.push(cells[source].clone());
            }
            Some(_) => out.push(cell.clone()),
            None => out.push(Cell::Missing),
        }
    }

    Ok((column.with_cells(out), filled))
}
