//! Outlier detection for numeric columns.
//!
//! Three methods are supported:
//!
//! - **IQR**: flag values outside `[Q1 - k*IQR, Q3 + k*IQR]`
//! - **Z-score**: flag values with `|x - mean| / std > t` (population std)
//! - **Modified z-score**: flag values with `|0.6745 * (x - median) / MAD| > t`
//!
//! Detection never modifies data. It produces an [`OutlierReport`] whose mask
//! the engine uses to remove rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OutlierDefaults;
use crate::engine::OperationBudget;
use crate::error::{PrepError, Result};
use crate::frame::NumericValues;
use crate::profiler::percentage;
use crate::types::{Column, Dataset, Role};

/// Scale factor relating MAD to the standard deviation of a normal
/// distribution.
pub const MAD_SCALE: f64 = 0.6745;

/// Minimum number of non-missing values required for detection.
pub const MIN_VALUES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Iqr,
    ZScore,
    ModifiedZScore,
}

impl OutlierMethod {
    /// Threshold used when the caller does not supply one.
    pub fn default_threshold(&self, defaults: &OutlierDefaults) -> f64 {
        match self {
            Self::Iqr => defaults.iqr_k,
            Self::ZScore => defaults.zscore_threshold,
            Self::ModifiedZScore => defaults.modified_zscore_threshold,
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Iqr => "IQR",
            Self::ZScore => "z-score",
            Self::ModifiedZScore => "modified z-score",
        })
    }
}

/// Value range outside of which values are flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

/// Result of running a detector over one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub column: String,
    pub method: OutlierMethod,
    pub threshold: f64,
    /// One flag per row; missing cells are never flagged.
    pub mask: Vec<bool>,
    pub outlier_count: usize,
    /// Share of non-missing values that were flagged, in percent.
    pub outlier_percentage: f64,
    /// Absent when the spread is zero, in which case nothing is flagged.
    pub bounds: Option<OutlierBounds>,
}

impl OutlierReport {
    /// Row indices of flagged values.
    pub fn outlier_rows(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, flagged)| flagged.then_some(i))
            .collect()
    }
}

/// Stateless outlier detector.
pub struct OutlierDetector;

impl OutlierDetector {
    /// Detect outliers in `column_name` of `dataset`.
    ///
    /// `threshold` overrides the configured default for the method.
    pub fn detect(
        dataset: &Dataset,
        column_name: &str,
        method: OutlierMethod,
        threshold: Option<f64>,
        defaults: &OutlierDefaults,
        budget: &OperationBudget,
    ) -> Result<OutlierReport> {
        let column = dataset.column(column_name)?;
        Self::detect_column(column, method, threshold, defaults, budget)
    }

    pub fn detect_column(
        column: &Column,
        method: OutlierMethod,
        threshold: Option<f64>,
        defaults: &OutlierDefaults,
        budget: &OperationBudget,
    ) -> Result<OutlierReport> {
        if column.role() != Role::Numeric {
            return Err(PrepError::UnsupportedRole {
                column: column.name().to_string(),
                role: column.role(),
                operation: "Outlier detection".to_string(),
            });
        }

        let threshold = threshold.unwrap_or_else(|| method.default_threshold(defaults));
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(PrepError::InvalidConfig(format!(
                "outlier threshold must be positive, got {threshold}"
            )));
        }

        let values = NumericValues::from_column(column);
        if values.len() < MIN_VALUES {
            return Err(PrepError::InsufficientData {
                column: column.name().to_string(),
                found: values.len(),
                required: MIN_VALUES,
            });
        }

        let scorer = Scorer::fit(method, threshold, &values);
        let mut mask = Vec::with_capacity(column.len());
        for (row, cell) in column.cells().iter().enumerate() {
            budget.tick(row)?;
            mask.push(cell.as_number().is_some_and(|x| scorer.is_outlier(x)));
        }

        let outlier_count = mask.iter().filter(|f| **f).count();
        debug!(
            "{} on '{}' (threshold {}): {} of {} values flagged",
            method,
            column.name(),
            threshold,
            outlier_count,
            values.len()
        );

        Ok(OutlierReport {
            column: column.name().to_string(),
            method,
            threshold,
            mask,
            outlier_count,
            outlier_percentage: percentage(outlier_count, values.len()),
            bounds: scorer.bounds(),
        })
    }
}

/// Fitted parameters of a detection method.
enum Scorer {
    Fence { lower: f64, upper: f64 },
    Standardized { center: f64, scale: f64, threshold: f64 },
    ModifiedStandardized { median: f64, mad: f64, threshold: f64 },
    /// Zero spread: nothing is an outlier.
    Degenerate,
}

impl Scorer {
    fn fit(method: OutlierMethod, threshold: f64, values: &NumericValues) -> Self {
        match method {
            OutlierMethod::Iqr => {
                let (Some(q1), Some(q3)) = (values.quantile(0.25), values.quantile(0.75)) else {
                    return Self::Degenerate;
                };
                let iqr = q3 - q1;
                Self::Fence {
                    lower: q1 - threshold * iqr,
                    upper: q3 + threshold * iqr,
                }
            }
            OutlierMethod::ZScore => match (values.mean(), values.std(0)) {
                (Some(center), Some(scale)) if scale > 0.0 => Self::Standardized {
                    center,
                    scale,
                    threshold,
                },
                _ => Self::Degenerate,
            },
            OutlierMethod::ModifiedZScore => {
                let Some(median) = values.median() else {
                    return Self::Degenerate;
                };
                match values.abs_deviations(median).median() {
                    Some(mad) if mad > 0.0 => Self::ModifiedStandardized {
                        median,
                        mad,
                        threshold,
                    },
                    _ => Self::Degenerate,
                }
            }
        }
    }

    fn is_outlier(&self, x: f64) -> bool {
        match self {
            Self::Fence { lower, upper } => x < *lower || x > *upper,
            Self::Standardized {
                center,
                scale,
                threshold,
            } => ((x - center) / scale).abs() > *threshold,
            Self::ModifiedStandardized {
                median,
                mad,
                threshold,
            } => (MAD_SCALE * (x - median) / mad).abs() > *threshold,
            Self::Degenerate => false,
        }
    }

    fn bounds(&self) -> Option<OutlierBounds> {
        match self {
            Self::Fence { lower, upper } => Some(OutlierBounds {
                lower: *lower,
                upper: *upper,
            }),
            Self::Standardized {
                center,
                scale,
                threshold,
            } => Some(OutlierBounds {
                lower: center - threshold * scale,
                upper: center + threshold * scale,
            }),
            Self::ModifiedStandardized {
                median,
                mad,
                threshold,
            } => {
                let half_width = threshold * mad / MAD_SCALE;
                Some(OutlierBounds {
                    lower: median - half_width,
                    upper: median + half_width,
                })
            }
            Self::Degenerate => None,
        }
    }
}
