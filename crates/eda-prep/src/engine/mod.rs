//! Transformation engine.
//!
//! This module provides the stateful pipeline that sits between ingestion and
//! the host UI:
//! - [`Operation`] requests and [`AppliedOperation`] records
//! - [`OperationExecutor`], which validates and runs one operation purely
//! - [`History`], the cursor-addressed arena of snapshots
//! - [`OperationBudget`] and [`CancellationToken`] for timeouts and cancellation
//! - [`TransformationEngine`], which ties them together with preview, undo and redo
//!
//! # Example
//!
//! ```rust
//! use eda_prep::config::EngineConfig;
//! use eda_prep::engine::{EngineState, Operation, TransformationEngine};
//! use eda_prep::types::{Cell, Column, Dataset, Role};
//!
//! let dataset = Dataset::new(vec![Column::new(
//!     "x",
//!     Role::Numeric,
//!     vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)],
//! )])?;
//!
//! let mut engine = TransformationEngine::new(EngineConfig::default());
//! engine.load(dataset);
//! engine.apply(Operation::DeleteRows { rows: vec![0] })?;
//! assert_eq!(engine.state(), EngineState::Modified);
//!
//! engine.undo()?;
//! assert_eq!(engine.current_dataset()?.row_count(), 3);
//! # Ok::<(), eda_prep::error::PrepError>(())
//! ```

pub mod budget;
mod executor;
mod history;
mod operations;

pub use budget::{CancellationToken, OperationBudget};
pub use executor::OperationExecutor;
pub use history::{History, HistoryEntry};
pub use operations::{AppliedOperation, Operation, OperationDetails, OperationKind};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{PrepError, Result};
use crate::reporting::{DatasetComparison, HistorySummary};
use crate::types::Dataset;

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No dataset loaded.
    Empty,
    /// Dataset loaded, cursor at the origin.
    Ready,
    /// At least one applied operation is active.
    Modified,
}

/// Result of a dry run: what `apply` would produce.
#[derive(Debug, Clone)]
pub struct Preview {
    pub dataset: Dataset,
    pub details: OperationDetails,
    pub comparison: DatasetComparison,
}

/// Applies operations to the current snapshot and records them in a
/// [`History`].
///
/// `apply` is atomic: the new snapshot is only committed once it has been
/// fully built, so any error leaves the history untouched.
#[derive(Debug)]
pub struct TransformationEngine {
    config: EngineConfig,
    history: Option<History>,
    token: CancellationToken,
}

impl TransformationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            history: None,
            token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a new history with `dataset` as the origin, replacing any
    /// previous one.
    pub fn load(&mut self, dataset: Dataset) {
        let (rows, cols) = dataset.shape();
        info!("Dataset loaded: {} rows x {} columns", rows, cols);
        self.history = Some(History::new(dataset));
    }

    pub fn state(&self) -> EngineState {
        match &self.history {
            None => EngineState::Empty,
            Some(h) if h.cursor() == 0 => EngineState::Ready,
            Some(_) => EngineState::Modified,
        }
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    fn history_ref(&self) -> Result<&History> {
        self.history.as_ref().ok_or(PrepError::NoDataLoaded)
    }

    fn history_mut(&mut self) -> Result<&mut History> {
        self.history.as_mut().ok_or(PrepError::NoDataLoaded)
    }

    pub fn current_dataset(&self) -> Result<&Dataset> {
        Ok(self.history_ref()?.current())
    }

    pub fn original_dataset(&self) -> Result<&Dataset> {
        Ok(self.history_ref()?.original())
    }

    /// Token that cancels the operation currently running on this engine.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn budget(&self) -> OperationBudget {
        OperationBudget::new(self.config.timeout(), self.token.clone())
    }

    fn run(&self, operation: &Operation) -> Result<(Dataset, OperationDetails)> {
        let current = self.current_dataset()?;
        let result = OperationExecutor::new(&self.config).execute(current, operation, &self.budget());
        if let Err(e) = &result {
            if e.is_aborted() {
                // the token guards one operation at a time
                self.token.reset();
            }
            warn!("{} failed: {}", operation.kind(), e);
        }
        result
    }

    /// Compute the result of `operation` without touching the history.
    pub fn preview(&self, operation: &Operation) -> Result<Preview> {
        let (dataset, details) = self.run(operation)?;
        let comparison = DatasetComparison::between(self.current_dataset()?, &dataset);
        debug!("Preview of {}: {}", operation.kind(), details.describe());
        Ok(Preview {
            dataset,
            details,
            comparison,
        })
    }

    /// Apply `operation` to the current snapshot and advance the cursor.
    ///
    /// Redo entries after the cursor are discarded.
    pub fn apply(&mut self, operation: Operation) -> Result<&HistoryEntry> {
        let (dataset, details) = self.run(&operation)?;
        let rows_before = self.current_dataset()?.row_count();
        let applied = AppliedOperation::new(operation, rows_before, dataset.row_count(), details);
        info!("Applied {}", applied.summary());

        let history = self.history_mut()?;
        let discarded = history.push(applied, dataset);
        if discarded > 0 {
            debug!("Discarded {} redo step(s)", discarded);
        }
        Ok(history.current_entry())
    }

    pub fn undo(&mut self) -> Result<&Dataset> {
        let history = self.history_mut()?;
        history.undo()?;
        info!("Undo: back to step {}", history.cursor());
        self.current_dataset()
    }

    pub fn redo(&mut self) -> Result<&Dataset> {
        self.history_mut()?.redo()?;
        info!("Redo: {}", self.history_ref()?.current_entry().summary);
        self.current_dataset()
    }

    /// Drop every applied step and return to the ingested dataset.
    pub fn restore_original(&mut self) -> Result<&Dataset> {
        self.history_mut()?.restore_original();
        info!("Restored original dataset");
        self.current_dataset()
    }

    /// Discard the dataset and history entirely.
    pub fn reset(&mut self) {
        if self.history.take().is_some() {
            info!("Engine reset");
        }
        self.token.reset();
    }

    pub fn history_summary(&self) -> Result<HistorySummary> {
        Ok(HistorySummary::from_history(self.history_ref()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imputers::ImputeStrategy;
    use crate::types::{Cell, Column, Role};

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "x",
                Role::Numeric,
                vec![
                    Cell::Number(1.0),
                    Cell::Missing,
                    Cell::Number(3.0),
                    Cell::Number(3.0),
                ],
            ),
            Column::new(
                "tag",
                Role::Categorical,
                vec![Cell::text("a"), Cell::text("b"), Cell::text("c"), Cell::text("c")],
            ),
        ])
        .unwrap()
    }

    fn engine() -> TransformationEngine {
        let mut engine = TransformationEngine::new(EngineConfig::default());
        engine.load(dataset());
        engine
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = TransformationEngine::new(EngineConfig::default());
        assert_eq!(engine.state(), EngineState::Empty);
        assert!(matches!(engine.current_dataset(), Err(PrepError::NoDataLoaded)));

        engine.load(dataset());
        assert_eq!(engine.state(), EngineState::Ready);

        engine
            .apply(Operation::DeleteRows { rows: vec![0] })
            .unwrap();
        assert_eq!(engine.state(), EngineState::Modified);

        engine.undo().unwrap();
        assert_eq!(engine.state(), EngineState::Ready);

        engine.reset();
        assert_eq!(engine.state(), EngineState::Empty);
    }

    #[test]
    fn test_undo_restores_previous_snapshot() {
        let mut engine = engine();
        engine
            .apply(Operation::Impute {
                columns: vec!["x".to_string()],
                strategy: ImputeStrategy::Mean,
            })
            .unwrap();
        assert_eq!(engine.current_dataset().unwrap().total_missing(), 0);

        assert_eq!(engine.undo().unwrap(), &dataset());
        assert!(matches!(engine.undo(), Err(PrepError::NothingToUndo)));
    }

    #[test]
    fn test_apply_after_undo_truncates_redo() {
        let mut engine = engine();
        engine.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
        engine.undo().unwrap();
        engine.apply(Operation::DeleteRows { rows: vec![1] }).unwrap();

        assert!(matches!(engine.redo(), Err(PrepError::NothingToRedo)));
        assert_eq!(engine.history_summary().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_apply_leaves_history_untouched() {
        let mut engine = engine();
        engine.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
        let before = engine.history_summary().unwrap();

        let err = engine
            .apply(Operation::RemoveOutliers {
                column: "tag".to_string(),
                method: crate::outliers::OutlierMethod::Iqr,
                threshold: None,
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ROLE");
        assert_eq!(engine.history_summary().unwrap(), before);
    }

    #[test]
    fn test_preview_does_not_record() {
        let engine = engine();
        let preview = engine
            .preview(&Operation::DropDuplicates {
                subset: Some(vec!["tag".to_string()]),
                keep: Default::default(),
            })
            .unwrap();
        assert_eq!(preview.dataset.row_count(), 3);
        assert_eq!(preview.comparison.rows_removed, 1);
        assert_eq!(engine.history_summary().unwrap().len(), 1);
        assert_eq!(engine.state(), EngineState::Ready);
    }

    #[test]
    fn test_cancelled_apply_resets_token() {
        let mut engine = engine();
        let token = engine.cancellation_token();
        token.cancel();
        let err = engine.apply(Operation::DeleteRows { rows: vec![0] }).unwrap_err();
        assert!(matches!(err, PrepError::Cancelled));
        assert!(!token.is_cancelled());
        assert_eq!(engine.state(), EngineState::Ready);

        engine.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
    }

    #[test]
    fn test_timed_out_apply_leaves_history_untouched() {
        let config = EngineConfig {
            timeout_seconds: 0,
            ..EngineConfig::default()
        };
        let mut engine = TransformationEngine::new(config);
        engine.load(dataset());
        let before = engine.history_summary().unwrap();

        let err = engine
            .apply(Operation::Impute {
                columns: vec!["x".to_string()],
                strategy: ImputeStrategy::Median,
            })
            .unwrap_err();
        assert!(matches!(err, PrepError::Timeout { limit_secs: 0, .. }));
        assert_eq!(err.error_code(), "TIMEOUT");
        assert_eq!(engine.history_summary().unwrap(), before);
        assert_eq!(engine.current_dataset().unwrap(), &dataset());
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(!engine.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_restore_original_keeps_one_entry() {
        let mut engine = engine();
        engine.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
        engine.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
        engine.undo().unwrap();

        assert_eq!(engine.restore_original().unwrap().row_count(), 4);
        assert_eq!(engine.history_summary().unwrap().len(), 1);
        assert!(matches!(engine.redo(), Err(PrepError::NothingToRedo)));
    }
}
