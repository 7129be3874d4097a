//! Data cleaning operations.
//!
//! This module provides functionality for:
//! - Converting columns between roles, counting cells that fail
//! - Removing duplicate rows on all columns or a subset

mod converters;
mod dedup;

pub use converters::{ConversionOutcome, TypeConverter};
pub use dedup::{Deduplicator, KeepPolicy};
