//! Stateful Preprocessing Engine
//!
//! An interactive preprocessing library for tabular datasets: upload a file,
//! apply cleaning operations one at a time, preview them, and undo or redo
//! freely.
//!
//! # Overview
//!
//! This library provides:
//!
//! - **Ingestion**: Encoding detection (UTF-8, Shift_JIS, EUC-JP, ...), delimiter
//!   sniffing, and spreadsheet reading of the first sheet
//! - **Type Inference**: Datetime, categorical, boolean, numeric and text roles
//! - **Outlier Detection**: IQR, Z-score and modified Z-score masks with bounds
//! - **Imputation**: Row deletion, mean, median, mode, forward/backward fill, constant
//! - **Cleaning**: Type conversion with counted failures, duplicate removal, row deletion
//! - **History**: Immutable snapshots with preview, undo, redo and restore
//! - **Polars Computation**: Aggregates, quantiles, fills and duplicate detection run on
//!   polars arrays built from the snapshots
//! - **Reporting**: Before/after comparison, history summary, CSV and polars export
//!
//! # Quick Start
//!
//! ```rust
//! use eda_prep::{EngineConfig, ImputeStrategy, Operation, OutlierMethod, Session};
//!
//! let csv = b"price,region\n10,north\n12,south\n,north\n11,south\n500,north\n";
//! let mut session = Session::ingest(csv, Some("sales.csv"), EngineConfig::default())?;
//!
//! session.apply(Operation::Impute {
//!     columns: vec!["price".to_string()],
//!     strategy: ImputeStrategy::Median,
//! })?;
//!
//! let preview = session.preview(&Operation::RemoveOutliers {
//!     column: "price".to_string(),
//!     method: OutlierMethod::Iqr,
//!     threshold: None,
//! })?;
//! println!("Would remove {} row(s)", preview.comparison.rows_removed);
//!
//! session.undo()?;
//! assert_eq!(session.history_summary()?.len(), 1);
//! # Ok::<(), eda_prep::PrepError>(())
//! ```
//!
//! # Configuration
//!
//! Use [`EngineConfig`] to adjust limits and detection rules:
//!
//! ```rust
//! use eda_prep::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .timeout_seconds(30)                 // Abort operations after 30 s
//!     .categorical_threshold(20)           // Up to 20 distinct values is categorical
//!     .na_values(["", "NA", "-"])          // Markers read as missing
//!     .build()?;
//! # Ok::<(), eda_prep::ConfigValidationError>(())
//! ```
//!
//! Settings can also be read from YAML with [`EngineConfig::from_yaml_file`].
//!
//! # Cancellation
//!
//! Every operation runs under a time budget. A host can also cancel the running
//! operation through the engine's [`CancellationToken`]; the history is left
//! unchanged and the call returns [`PrepError::Cancelled`].

pub mod cleaner;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod imputers;
pub mod ingest;
pub mod outliers;
pub mod profiler;
pub mod reporting;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{Deduplicator, KeepPolicy, TypeConverter};
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder, OutlierDefaults};
pub use engine::{
    AppliedOperation, CancellationToken, EngineState, History, HistoryEntry, Operation,
    OperationBudget, OperationDetails, OperationKind, Preview, TransformationEngine,
};
pub use error::{ErrorCategory, PrepError, Result as PrepResult, ResultExt};
pub use frame::NumericValues;
pub use imputers::{ImputeStrategy, MissingValueImputer};
pub use ingest::{FileIngestor, RawTable, SourceFormat};
pub use outliers::{OutlierBounds, OutlierDetector, OutlierMethod, OutlierReport};
pub use profiler::{ColumnInfo, ColumnStatistics, DatasetSummary, TypeInferencer};
pub use reporting::{DatasetComparison, HistorySummary, HistorySummaryEntry, history_report_text};
pub use session::{Session, SessionId, SessionManager};
pub use types::{Cell, Column, Dataset, Role};
