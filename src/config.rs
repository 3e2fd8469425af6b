//! Analysis configuration
//!
//! Thresholds and window sizes are carried explicitly into every detector call
//! through these values rather than read from module-level state.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Default z-score threshold for both detectors
pub const DEFAULT_THRESHOLD: f64 = 2.5;

/// Default trailing window for the rolling detector, in days
pub const DEFAULT_WINDOW: usize = 7;

/// Default percentile above which a pincode is considered high volume
pub const DEFAULT_PINCODE_PERCENTILE: f64 = 95.0;

/// Default length of "top N" listings in reports
pub const DEFAULT_TOP_N: usize = 10;

/// Number of z-score anomalies that receive an explanation in a report
pub const DEFAULT_EXPLAINED_ANOMALIES: usize = 5;

/// Detector parameters shared by the z-score and rolling detectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Absolute deviation (in standard deviations) at which a point is flagged
    pub threshold: f64,
    /// Number of preceding points forming the rolling reference window
    pub window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            window: DEFAULT_WINDOW,
        }
    }
}

impl DetectorConfig {
    pub fn new(threshold: f64, window: usize) -> Result<Self, AnalysisError> {
        let config = Self { threshold, window };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        validate_threshold(self.threshold)?;
        validate_window(self.window)
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detector: DetectorConfig,
    /// Percentile of pincode totals above which a pincode is flagged (0-100]
    pub pincode_percentile: f64,
    /// Length of top-N listings (peak days, top pincodes)
    pub top_n: usize,
    /// How many high z-score days get a written explanation
    pub explained_anomalies: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            pincode_percentile: DEFAULT_PINCODE_PERCENTILE,
            top_n: DEFAULT_TOP_N,
            explained_anomalies: DEFAULT_EXPLAINED_ANOMALIES,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.detector.validate()?;
        if !(self.pincode_percentile > 0.0 && self.pincode_percentile <= 100.0) {
            return Err(AnalysisError::invalid_parameter(
                "pincode_percentile",
                format!("must be in (0, 100], got {}", self.pincode_percentile),
            ));
        }
        Ok(())
    }

    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), AnalysisError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(AnalysisError::invalid_parameter(
            "threshold",
            format!("must be a positive number, got {threshold}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_window(window: usize) -> Result<(), AnalysisError> {
    if window < 2 {
        // A sample standard deviation needs at least two points
        return Err(AnalysisError::invalid_parameter(
            "window",
            format!("must be at least 2, got {window}"),
        ));
    }
    Ok(())
}
