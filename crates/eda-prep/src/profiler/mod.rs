//! Dataset profiling.
//!
//! This module provides:
//! - Role inference and typed-cell construction for ingested columns
//! - Per-column statistics, missing-value reports and dataset summaries

mod statistics;
mod type_inference;

pub use statistics::{
    ColumnInfo, ColumnStatistics, DatasetSummary, MissingColumnReport, NumericSummary, ValueCount,
};
pub use type_inference::TypeInferencer;

pub(crate) use statistics::percentage;
