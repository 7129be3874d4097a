//! Before/after comparison of two dataset snapshots.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Dataset, Role};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-column difference for a column present in both snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub column: String,
    pub missing_before: usize,
    pub missing_after: usize,
    /// `missing_after - missing_before`.
    pub missing_change: i64,
    pub role_before: Role,
    pub role_after: Role,
}

impl ColumnChange {
    pub fn role_changed(&self) -> bool {
        self.role_before != self.role_after
    }
}

/// Shape, memory and per-column differences between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetComparison {
    pub shape_before: (usize, usize),
    pub shape_after: (usize, usize),
    /// Negative when rows were added.
    pub rows_removed: i64,
    pub memory_before_mb: f64,
    pub memory_after_mb: f64,
    pub column_changes: Vec<ColumnChange>,
    pub columns_added: Vec<String>,
    pub columns_removed: Vec<String>,
}

impl DatasetComparison {
    pub fn between(before: &Dataset, after: &Dataset) -> Self {
        let after_names: HashSet<&str> = after.column_names().into_iter().collect();
        let before_names: HashSet<&str> = before.column_names().into_iter().collect();

        let column_changes = before
            .columns()
            .iter()
            .filter_map(|old| {
                let new = after.column(old.name()).ok()?;
                let (missing_before, missing_after) = (old.missing_count(), new.missing_count());
                Some(ColumnChange {
                    column: old.name().to_string(),
                    missing_before,
                    missing_after,
                    missing_change: missing_after as i64 - missing_before as i64,
                    role_before: old.role(),
                    role_after: new.role(),
                })
            })
            .collect();

        Self {
            shape_before: before.shape(),
            shape_after: after.shape(),
            rows_removed: before.row_count() as i64 - after.row_count() as i64,
            memory_before_mb: before.estimated_memory_bytes() as f64 / BYTES_PER_MB,
            memory_after_mb: after.estimated_memory_bytes() as f64 / BYTES_PER_MB,
            column_changes,
            columns_added: after
                .column_names()
                .into_iter()
                .filter(|name| !before_names.contains(name))
                .map(str::to_string)
                .collect(),
            columns_removed: before
                .column_names()
                .into_iter()
                .filter(|name| !after_names.contains(name))
                .map(str::to_string)
                .collect(),
        }
    }

    /// Columns whose missing count or role differ.
    pub fn changed_columns(&self) -> impl Iterator<Item = &ColumnChange> {
        self.column_changes
            .iter()
            .filter(|c| c.missing_change != 0 || c.role_changed())
    }

    pub fn total_missing_change(&self) -> i64 {
        self.column_changes.iter().map(|c| c.missing_change).sum()
    }
}
