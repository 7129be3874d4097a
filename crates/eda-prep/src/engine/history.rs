//! Linear, cursor-addressed history of dataset snapshots.

use std::sync::Arc;

use chrono::{DateTime, Local};

use super::operations::AppliedOperation;
use crate::error::{PrepError, Result};
use crate::types::Dataset;

/// One snapshot in the history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// `None` for the ingested origin.
    pub operation: Option<AppliedOperation>,
    pub dataset: Arc<Dataset>,
    pub summary: String,
    pub recorded_at: DateTime<Local>,
}

/// Ordered snapshots plus a cursor.
///
/// Position 0 is always the ingested dataset. Entries after the cursor are
/// redo candidates and are discarded by the next [`History::push`].
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl History {
    pub fn new(origin: Dataset) -> Self {
        let (rows, cols) = origin.shape();
        Self {
            entries: vec![HistoryEntry {
                operation: None,
                dataset: Arc::new(origin),
                summary: format!("Loaded dataset ({rows} rows x {cols} columns)"),
                recorded_at: Local::now(),
            }],
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total entries, including redo candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> &Dataset {
        &self.entries[self.cursor].dataset
    }

    pub fn original(&self) -> &Dataset {
        &self.entries[0].dataset
    }

    /// Entries from the origin up to and including the cursor.
    pub fn active_entries(&self) -> &[HistoryEntry] {
        &self.entries[..=self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Append a snapshot after the cursor, discarding any redo entries.
    ///
    /// Returns the number of discarded entries.
    pub fn push(&mut self, operation: AppliedOperation, dataset: Dataset) -> usize {
        let discarded = self.entries.len() - (self.cursor + 1);
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            summary: operation.summary(),
            recorded_at: operation.timestamp,
            operation: Some(operation),
            dataset: Arc::new(dataset),
        });
        self.cursor += 1;
        discarded
    }

    pub fn undo(&mut self) -> Result<&Dataset> {
        if !self.can_undo() {
            return Err(PrepError::NothingToUndo);
        }
        self.cursor -= 1;
        Ok(self.current())
    }

    pub fn redo(&mut self) -> Result<&Dataset> {
        if !self.can_redo() {
            return Err(PrepError::NothingToRedo);
        }
        self.cursor += 1;
        Ok(self.current())
    }

    /// Drop every entry after the origin and move the cursor back to it.
    pub fn restore_original(&mut self) {
        self.entries.truncate(1);
        self.cursor = 0;
    }

    /// The entry the cursor points at.
    pub fn current_entry(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }
}
