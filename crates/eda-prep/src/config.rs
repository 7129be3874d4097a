//! Configuration for the preprocessing engine.
//!
//! [`EngineConfig`] is consumed once at session creation and validated there.
//! It can be built with the fluent [`EngineConfigBuilder`], deserialized from
//! JSON, or loaded from a YAML settings file.
//!
//! # Example
//!
//! ```rust
//! use eda_prep::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .categorical_threshold(20)
//!     .timeout_seconds(30)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.categorical_threshold, 20);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PrepError, Result};

/// Default `strftime` patterns tried by the type inferencer.
pub const DEFAULT_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Default ranked encoding candidates: UTF-8, the Japanese locale group, then
/// a single-byte fallback that accepts any byte sequence.
pub const DEFAULT_ENCODINGS: [&str; 5] =
    ["utf-8", "shift_jis", "euc-jp", "iso-2022-jp", "windows-1252"];

/// Default raw values treated as missing on ingestion.
pub const DEFAULT_NA_VALUES: [&str; 6] = ["", "None", "null", "NULL", "nan", "NaN"];

/// Default thresholds for each outlier method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierDefaults {
    /// IQR fence multiplier `k`.
    pub iqr_k: f64,
    /// Absolute z-score above which a value is flagged.
    pub zscore_threshold: f64,
    /// Absolute modified z-score above which a value is flagged.
    pub modified_zscore_threshold: f64,
}

impl Default for OutlierDefaults {
    fn default() -> Self {
        Self {
            iqr_k: 1.5,
            zscore_threshold: 3.0,
            modified_zscore_threshold: 3.5,
        }
    }
}

/// Configuration for ingestion and the transformation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Uploads larger than this are rejected.
    /// Default: 3000
    pub max_file_size_mb: u64,

    /// Tables whose estimated in-memory size exceeds this are rejected.
    /// Default: 16.0
    pub max_memory_usage_gb: f64,

    /// Time budget for a single operation.
    /// Default: 120
    pub timeout_seconds: u64,

    /// Maximum number of distinct values for a Categorical column.
    /// Default: 10
    pub categorical_threshold: usize,

    /// Ordered `strftime` patterns tried when detecting datetimes.
    pub datetime_formats: Vec<String>,

    /// Default thresholds per outlier method.
    pub outlier: OutlierDefaults,

    /// Ranked encoding labels tried on delimited text.
    pub encodings: Vec<String>,

    /// Raw values that are read as missing.
    pub na_values: Vec<String>,

    /// Number of leading rows sampled for encoding and delimiter detection.
    /// Default: 100
    pub sample_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 3000,
            max_memory_usage_gb: 16.0,
            timeout_seconds: 120,
            categorical_threshold: 10,
            datetime_formats: DEFAULT_DATETIME_FORMATS.iter().map(|s| s.to_string()).collect(),
            outlier: OutlierDefaults::default(),
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
            sample_rows: 100,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Operation time budget as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn max_memory_bytes(&self) -> f64 {
        self.max_memory_usage_gb * 1024.0 * 1024.0 * 1024.0
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.max_file_size_mb == 0 {
            return Err(ConfigValidationError::NotPositive {
                field: "max_file_size_mb".to_string(),
                value: 0.0,
            });
        }
        if !(self.max_memory_usage_gb > 0.0) {
            return Err(ConfigValidationError::NotPositive {
                field: "max_memory_usage_gb".to_string(),
                value: self.max_memory_usage_gb,
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigValidationError::NotPositive {
                field: "timeout_seconds".to_string(),
                value: 0.0,
            });
        }
        if self.sample_rows == 0 {
            return Err(ConfigValidationError::NotPositive {
                field: "sample_rows".to_string(),
                value: 0.0,
            });
        }

        let thresholds = [
            ("outlier.iqr_k", self.outlier.iqr_k),
            ("outlier.zscore_threshold", self.outlier.zscore_threshold),
            (
                "outlier.modified_zscore_threshold",
                self.outlier.modified_zscore_threshold,
            ),
        ];
        for (field, value) in thresholds {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigValidationError::NotPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.datetime_formats.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyDatetimeFormat);
        }

        if self.encodings.is_empty() {
            return Err(ConfigValidationError::NoEncodings);
        }
        for label in &self.encodings {
            if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
                return Err(ConfigValidationError::UnknownEncoding(label.clone()));
            }
        }

        Ok(())
    }

    /// Parse a YAML settings document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML settings file.
    ///
    /// A missing file is not an error: the defaults are used and a warning is
    /// logged. A file that exists but does not parse or validate is an error.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        debug!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be positive)")]
    NotPositive { field: String, value: f64 },

    #[error("Datetime formats must not be empty strings")]
    EmptyDatetimeFormat,

    #[error("At least one encoding candidate is required")]
    NoEncodings,

    #[error("Unknown encoding label '{0}'")]
    UnknownEncoding(String),
}

impl From<ConfigValidationError> for PrepError {
    fn from(err: ConfigValidationError) -> Self {
        PrepError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    max_file_size_mb: Option<u64>,
    max_memory_usage_gb: Option<f64>,
    timeout_seconds: Option<u64>,
    categorical_threshold: Option<usize>,
    datetime_formats: Option<Vec<String>>,
    outlier: Option<OutlierDefaults>,
    encodings: Option<Vec<String>>,
    na_values: Option<Vec<String>>,
    sample_rows: Option<usize>,
}

impl EngineConfigBuilder {
    /// Set the upload size limit in megabytes.
    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = Some(mb);
        self
    }

    /// Set the in-memory size ceiling in gigabytes.
    pub fn max_memory_usage_gb(mut self, gb: f64) -> Self {
        self.max_memory_usage_gb = Some(gb);
        self
    }

    /// Set the per-operation time budget.
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Set the distinct-value cutoff for Categorical inference.
    pub fn categorical_threshold(mut self, threshold: usize) -> Self {
        self.categorical_threshold = Some(threshold);
        self
    }

    /// Replace the datetime patterns.
    pub fn datetime_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datetime_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Set default outlier thresholds.
    pub fn outlier_defaults(mut self, defaults: OutlierDefaults) -> Self {
        self.outlier = Some(defaults);
        self
    }

    /// Replace the ranked encoding candidates.
    pub fn encodings<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encodings = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the missing-value markers.
    pub fn na_values<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.na_values = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Set how many rows the format detector samples.
    pub fn sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            max_file_size_mb: self.max_file_size_mb.unwrap_or(defaults.max_file_size_mb),
            max_memory_usage_gb: self.max_memory_usage_gb.unwrap_or(defaults.max_memory_usage_gb),
            timeout_seconds: self.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            categorical_threshold: self
                .categorical_threshold
                .unwrap_or(defaults.categorical_threshold),
            datetime_formats: self.datetime_formats.unwrap_or(defaults.datetime_formats),
            outlier: self.outlier.unwrap_or(defaults.outlier),
            encodings: self.encodings.unwrap_or(defaults.encodings),
            na_values: self.na_values.unwrap_or(defaults.na_values),
            sample_rows: self.sample_rows.unwrap_or(defaults.sample_rows),
        };

        config.validate()?;
        Ok(config)
    }
}
