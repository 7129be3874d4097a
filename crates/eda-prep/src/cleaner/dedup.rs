//! Duplicate row removal.

use std::fmt;

use polars::prelude::UniqueKeepStrategy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::OperationBudget;
use crate::error::{PrepError, Result};
use crate::frame::unique_rows;
use crate::types::{Column, Dataset};

/// Which occurrence of a duplicated row survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    #[default]
    First,
    Last,
}

impl From<KeepPolicy> for UniqueKeepStrategy {
    fn from(keep: KeepPolicy) -> Self {
        match keep {
            KeepPolicy::First => UniqueKeepStrategy::First,
            KeepPolicy::Last => UniqueKeepStrategy::Last,
        }
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Last => "last",
        })
    }
}

/// Removes rows that are exact duplicates of another row.
pub struct Deduplicator;

impl Deduplicator {
    /// Drop duplicate rows, comparing all columns or only `subset`.
    ///
    /// Surviving rows keep their original order. Returns the new dataset and
    /// the number of rows removed.
    pub fn drop_duplicates(
        dataset: &Dataset,
        subset: Option<&[String]>,
        keep: KeepPolicy,
        budget: &OperationBudget,
    ) -> Result<(Dataset, usize)> {
        let mut key_columns: Vec<&Column> = match subset {
            Some(names) => names
                .iter()
                .map(|name| dataset.column(name))
                .collect::<Result<_>>()?,
            None => dataset.columns().iter().collect(),
        };
        let mut seen = Vec::with_capacity(key_columns.len());
        key_columns.retain(|column| {
            let first = !seen.contains(&column.name());
            seen.push(column.name());
            first
        });
        if key_columns.is_empty() {
            return Err(PrepError::InvalidOperation(
                "duplicate detection needs at least one key column".to_string(),
            ));
        }

        budget.check()?;
        let survivors = unique_rows(&key_columns, keep.into())?;
        budget.check()?;

        let rows = dataset.row_count();
        let mut keep_mask = vec![false; rows];
        for row in survivors {
            keep_mask[row] = true;
        }

        let result = dataset.filter_rows(&keep_mask)?;
        let removed = rows - result.row_count();
        debug!(
            "Duplicate scan over {} key column(s), keep {}: {} of {} rows removed",
            key_columns.len(),
            keep,
            removed,
            rows
        );
        Ok((result, removed))
    }

    /// Number of rows that would be removed with the given key.
    pub fn count_duplicates(dataset: &Dataset, subset: Option<&[String]>) -> Result<usize> {
        let (_, removed) = Self::drop_duplicates(
            dataset,
            subset,
            KeepPolicy::First,
            &OperationBudget::unlimited(),
        )?;
        Ok(removed)
    }
}
