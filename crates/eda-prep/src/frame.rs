//! Polars views over role-tagged columns.
//!
//! Snapshots keep their cells; the numeric and row-level computations run on
//! polars arrays built from them.
//!
//! This module provides:
//! - [`Column::to_series`]: a typed series per role
//! - [`NumericValues`]: mean, median, spread and quantiles of finite values
//! - [`fill_sources`]: forward/backward fill expressed as source row positions
//! - [`unique_rows`]: rows surviving duplicate removal over a set of keys

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::error::Result;
use crate::types::{Cell, Column as DataColumn, Role};

impl DataColumn {
    /// Typed polars series of the cells, one dtype per role.
    ///
    /// Cells whose kind does not match the role become null.
    pub fn to_series(&self) -> Series {
        let name: PlSmallStr = self.name().into();
        let cells = self.cells();
        match self.role() {
            Role::Numeric => Series::new(
                name,
                cells.iter().map(Cell::as_number).collect::<Vec<Option<f64>>>(),
            ),
            Role::Boolean => Series::new(
                name,
                cells
                    .iter()
                    .map(|c| match c {
                        Cell::Boolean(b) => Some(*b),
                        _ => None,
                    })
                    .collect::<Vec<Option<bool>>>(),
            ),
            Role::Datetime => Series::new(
                name,
                cells
                    .iter()
                    .map(|c| match c {
                        Cell::DateTime(dt) => Some(*dt),
                        _ => None,
                    })
                    .collect::<Vec<Option<NaiveDateTime>>>(),
            ),
            Role::Categorical | Role::Text => Series::new(
                name,
                cells.iter().map(Cell::render).collect::<Vec<Option<String>>>(),
            ),
        }
    }
}

/// Finite values of a numeric column held as a polars array.
#[derive(Debug, Clone)]
pub struct NumericValues {
    values: Float64Chunked,
}

impl NumericValues {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: Float64Chunked::from_slice(PlSmallStr::EMPTY, values),
        }
    }

    /// Numeric cells of `column`; missing cells are skipped.
    pub fn from_column(column: &DataColumn) -> Self {
        Self::new(&column.numeric_values())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        self.values.mean()
    }

    pub fn median(&self) -> Option<f64> {
        self.values.median()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.min()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.max()
    }

    /// Standard deviation with `ddof` delta degrees of freedom.
    pub fn std(&self, ddof: u8) -> Option<f64> {
        self.values.std(ddof)
    }

    /// Quantile with linear interpolation between closest ranks.
    ///
    /// `None` when there are no values or `q` is outside `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.values
            .quantile(q, QuantileMethod::Linear)
            .ok()
            .flatten()
    }

    /// Absolute distance of every value from `center`.
    pub fn abs_deviations(&self, center: f64) -> Self {
        Self {
            values: self.values.apply_values(|v| (v - center).abs()),
        }
    }
}

/// For every row, the position whose value fills it.
///
/// Rows holding a value point at themselves. Missing rows point at the
/// nearest value before them (`Forward`) or after them (`Backward`), or are
/// `None` when no such value exists.
pub fn fill_sources(column: &DataColumn, strategy: FillNullStrategy) -> Result<Vec<Option<usize>>> {
    let positions: Vec<Option<u64>> = column
        .cells()
        .iter()
        .enumerate()
        .map(|(row, cell)| (!cell.is_missing()).then_some(row as u64))
        .collect();

    let filled = Series::new(column.name().into(), positions).fill_null(strategy)?;
    Ok(filled
        .u64()?
        .into_iter()
        .map(|source| source.map(|s| s as usize))
        .collect())
}

/// Positions of the rows that survive duplicate removal over `keys`, in
/// ascending order.
///
/// Missing cells compare equal to each other.
pub fn unique_rows(keys: &[&DataColumn], keep: UniqueKeepStrategy) -> Result<Vec<usize>> {
    let names: Vec<String> = keys.iter().map(|c| c.name().to_string()).collect();
    let mut index_name = String::from("__row_index");
    while names.contains(&index_name) {
        index_name.push('_');
    }

    let frame = DataFrame::new(keys.iter().map(|c| c.to_series().into()).collect())?
        .with_row_index(index_name.as_str().into(), None)?;
    let unique = frame.unique_stable(Some(&names), keep, None)?;

    Ok(unique
        .column(&index_name)?
        .idx()?
        .into_no_null_iter()
        .map(|row| row as usize)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[Option<f64>]) -> DataColumn {
        DataColumn::new(
            "x",
            Role::Numeric,
            values
                .iter()
                .map(|v| v.map(Cell::Number).unwrap_or(Cell::Missing))
                .collect(),
        )
    }

    #[test]
    fn test_quantiles_interpolate() {
        let values = NumericValues::new(&[5.0, 1.0, 100.0, 3.0, 2.0, 4.0]);
        assert_eq!(values.quantile(0.25), Some(2.25));
        assert_eq!(values.quantile(0.75), Some(4.75));
        assert_eq!(values.quantile(1.5), None);
        assert_eq!(NumericValues::new(&[3.0, 1.0, 2.0]).median(), Some(2.0));
        assert_eq!(NumericValues::new(&[4.0, 1.0, 2.0, 3.0]).median(), Some(2.5));
        assert_eq!(NumericValues::new(&[]).median(), None);
    }

    #[test]
    fn test_population_and_sample_std() {
        let values = NumericValues::new(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((values.std(0).unwrap() - 2.0).abs() < 1e-12);
        assert!(values.std(1).unwrap() > 2.0);
        assert_eq!(values.mean(), Some(5.0));
        assert_eq!(NumericValues::new(&[]).mean(), None);
    }

    #[test]
    fn test_abs_deviations() {
        let deviations = NumericValues::new(&[1.0, 2.0, 6.0]).abs_deviations(2.0);
        assert_eq!(deviations.median(), Some(1.0));
        assert_eq!(deviations.max(), Some(4.0));
    }

    #[test]
    fn test_series_follow_roles() {
        let series = numbers(&[Some(1.5), None]).to_series();
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 1);

        let text = DataColumn::new("t", Role::Text, vec![Cell::text("a"), Cell::Missing]);
        assert_eq!(text.to_series().dtype(), &DataType::String);
    }

    #[test]
    fn test_fill_sources_both_directions() {
        let column = numbers(&[None, Some(1.0), None, Some(3.0), None]);
        assert_eq!(
            fill_sources(&column, FillNullStrategy::Forward(None)).unwrap(),
            vec![None, Some(1), Some(1), Some(3), Some(3)]
        );
        assert_eq!(
            fill_sources(&column, FillNullStrategy::Backward(None)).unwrap(),
            vec![Some(1), Some(1), Some(3), Some(3), None]
        );
    }

    #[test]
    fn test_unique_rows_keep_first_and_last() {
        let key = numbers(&[Some(1.0), Some(1.0), Some(2.0), Some(1.0)]);
        assert_eq!(
            unique_rows(&[&key], UniqueKeepStrategy::First).unwrap(),
            vec![0, 2]
        );
        assert_eq!(
            unique_rows(&[&key], UniqueKeepStrategy::Last).unwrap(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_unique_rows_tolerates_index_name_clash() {
        let key = DataColumn::new(
            "__row_index",
            Role::Text,
            vec![Cell::text("a"), Cell::text("a")],
        );
        assert_eq!(
            unique_rows(&[&key], UniqueKeepStrategy::First).unwrap(),
            vec![0]
        );
    }
}
