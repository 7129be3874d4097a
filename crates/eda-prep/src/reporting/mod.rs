//! Report generation module.
//!
//! This module provides functionality for:
//! - Comparing two dataset snapshots (shape, memory, per-column missing counts and roles)
//! - Summarizing the active history as a serializable step list
//! - Rendering that summary as a plain-text step log
//! - Exporting a dataset as CSV or as a polars `DataFrame`
//!
//! # Example
//!
//! ```rust,ignore
//! use eda_prep::reporting::{history_report_text, DatasetComparison};
//!
//! let comparison = DatasetComparison::between(session.original(), session.current_dataset()?);
//! println!("{}", serde_json::to_string_pretty(&comparison)?);
//!
//! let summary = session.history_summary()?;
//! std::fs::write("history.txt", history_report_text(&summary, "sales.csv"))?;
//! ```

mod comparison;
pub mod export;
mod summary;

pub use comparison::{ColumnChange, DatasetComparison};
pub use export::{to_dataframe, write_csv, write_csv_file};
pub use summary::{history_report_text, HistorySummary, HistorySummaryEntry};
