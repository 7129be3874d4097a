//! Error types for the preprocessing engine.
//!
//! Every failure is surfaced as a typed [`PrepError`]. Errors are grouped into
//! an [`ErrorCategory`] so callers can render them uniformly, and each variant
//! carries a stable code for frontend handling.
//!
//! Errors are serializable so they can be handed to a UI layer as-is.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::types::Role;

/// Broad family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The uploaded bytes could not be turned into a table.
    Ingestion,
    /// The requested operation is not legal for the current dataset.
    Validation,
    /// The operation was legal but its computation could not complete.
    Computation,
    /// Undo/redo navigation or missing session data.
    History,
    /// Timeouts, cancellation and memory ceilings.
    Resource,
    /// IO, serialization and other plumbing failures.
    Internal,
}

/// The main error type for the preprocessing engine.
#[derive(Error, Debug)]
pub enum PrepError {
    /// No encoding candidate could decode the file, or the table is malformed.
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    /// The file decoded correctly but contains no data rows.
    #[error("File contains no data rows")]
    EmptyFile,

    /// The raw upload exceeds `max_file_size_mb`.
    #[error("File is {size_mb:.1} MB, larger than the {limit_mb} MB limit")]
    FileTooLarge { size_mb: f64, limit_mb: u64 },

    /// The file extension is not a delimited-text or spreadsheet format.
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    /// The operation does not apply to a column with this role.
    #[error("{operation} is not supported for column '{column}' with role {role}")]
    UnsupportedRole {
        column: String,
        role: Role,
        operation: String,
    },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A user-supplied value is not compatible with the column role.
    #[error("Value '{value}' is not compatible with column '{column}' ({role})")]
    TypeMismatch {
        column: String,
        role: Role,
        value: String,
    },

    /// A row index outside the dataset was referenced.
    #[error("Row {row} is out of range for a dataset with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },

    /// A dataset could not be constructed (ragged columns, duplicate names).
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation parameters are malformed (e.g. no target columns).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Not enough non-missing values to compute a statistic.
    #[error("Column '{column}' has {found} usable values, at least {required} required")]
    InsufficientData {
        column: String,
        found: usize,
        required: usize,
    },

    /// Strict type conversion failed on at least one cell.
    #[error("Failed to convert {failed} cell(s) of column '{column}' to {target}")]
    ConversionError {
        column: String,
        target: Role,
        failed: usize,
    },

    /// Undo requested at the original dataset.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Redo requested with no undone steps.
    #[error("Nothing to redo")]
    NothingToRedo,

    /// The engine has no dataset loaded.
    #[error("No data loaded")]
    NoDataLoaded,

    /// No session is registered under this id.
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// The operation exceeded the configured time budget.
    #[error("Operation timed out after {elapsed_ms} ms (limit {limit_secs} s)")]
    Timeout { elapsed_ms: u128, limit_secs: u64 },

    /// The estimated in-memory size exceeds `max_memory_usage_gb`.
    #[error("Estimated size {estimated_gb:.2} GB exceeds the {limit_gb} GB memory ceiling")]
    MemoryCeilingExceeded { estimated_gb: f64, limit_gb: f64 },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error wrapper.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML settings error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrepError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnreadableFile(_) => "UNREADABLE_FILE",
            Self::EmptyFile => "EMPTY_FILE",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::UnsupportedRole { .. } => "UNSUPPORTED_ROLE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::RowOutOfRange { .. } => "ROW_OUT_OF_RANGE",
            Self::InvalidDataset(_) => "INVALID_DATASET",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::ConversionError { .. } => "CONVERSION_ERROR",
            Self::NothingToUndo => "NOTHING_TO_UNDO",
            Self::NothingToRedo => "NOTHING_TO_REDO",
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::Timeout { .. } => "TIMEOUT",
            Self::MemoryCeilingExceeded { .. } => "MEMORY_CEILING_EXCEEDED",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Get the family this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnreadableFile(_)
            | Self::EmptyFile
            | Self::FileTooLarge { .. }
            | Self::UnsupportedFormat(_) => ErrorCategory::Ingestion,
            Self::UnsupportedRole { .. }
            | Self::ColumnNotFound(_)
            | Self::TypeMismatch { .. }
            | Self::RowOutOfRange { .. }
            | Self::InvalidDataset(_)
            | Self::InvalidConfig(_)
            | Self::InvalidOperation(_) => ErrorCategory::Validation,
            Self::InsufficientData { .. } | Self::ConversionError { .. } => {
                ErrorCategory::Computation
            }
            Self::NothingToUndo
            | Self::NothingToRedo
            | Self::NoDataLoaded
            | Self::SessionNotFound(_) => ErrorCategory::History,
            Self::Timeout { .. } | Self::MemoryCeilingExceeded { .. } | Self::Cancelled => {
                ErrorCategory::Resource
            }
            Self::Io(_) | Self::Csv(_) | Self::Json(_) | Self::Yaml(_) | Self::Polars(_) => {
                ErrorCategory::Internal
            }
            Self::WithContext { source, .. } => source.category(),
        }
    }

    /// Check if this error represents a cancellation or timeout.
    pub fn is_aborted(&self) -> bool {
        match self {
            Self::Cancelled | Self::Timeout { .. } => true,
            Self::WithContext { source, .. } => source.is_aborted(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code`, `category` and `message` fields.
impl Serialize for PrepError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PrepError", 3)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("category", &self.category())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PrepError::Io(e).with_context(context))
    }
}
