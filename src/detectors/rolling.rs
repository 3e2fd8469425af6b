//! Trailing-window detector
//!
//! Scores each point against the `window` points immediately before it; the
//! point itself is never part of its own reference. Points without a full
//! window of history are reported as not evaluated.

use crate::config::{validate_threshold, validate_window, DEFAULT_THRESHOLD, DEFAULT_WINDOW};
use crate::error::AnalysisError;
use crate::stats;
use crate::types::{AnomalyResult, DailySeriesPoint, Method, ReferenceScope, ReferenceStats};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ensure_sorted, AnomalyDetector, ScoredPoint};

/// Spread assumed for a trailing window with no variation.
///
/// Counts are whole enrolments, so a flat history is scored in units of one
/// enrolment instead of being left unscored.
pub const FLAT_WINDOW_SPREAD: f64 = 1.0;

/// Rolling-window detector over a date-sorted series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingDetector {
    window: usize,
    threshold: f64,
}

impl Default for RollingDetector {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl RollingDetector {
    pub fn new(window: usize, threshold: f64) -> Result<Self, AnalysisError> {
        validate_window(window)?;
        validate_threshold(threshold)?;
        Ok(Self { window, threshold })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Reference statistics for the point at `index`, if it has a full window
    pub fn reference(&self, series: &[DailySeriesPoint], index: usize) -> Option<ReferenceStats> {
        if index < self.window || index >= series.len() {
            return None;
        }
        let values: Vec<f64> = series[index - self.window..index]
            .iter()
            .map(|p| p.total_enrolments as f64)
            .collect();
        Some(ReferenceStats {
            scope: ReferenceScope::Trailing { days: self.window },
            mean: stats::mean(&values)?,
            std_dev: stats::sample_std_dev(&values),
            sample_size: values.len(),
        })
    }
}

impl AnomalyDetector for RollingDetector {
    fn method(&self) -> Method {
        Method::Rolling
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, series: &[DailySeriesPoint]) -> Result<Vec<ScoredPoint>, AnalysisError> {
        ensure_sorted(series)?;

        let scored: Vec<ScoredPoint> = series
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let value = point.total_enrolments;
                let reference = self.reference(series, index);
                let score = reference.and_then(|r| {
                    let spread = if r.std_dev > 0.0 { r.std_dev } else { FLAT_WINDOW_SPREAD };
                    stats::z_score(value as f64, r.mean, spread)
                });
                ScoredPoint {
                    date: point.date,
                    value,
                    score,
                    reference,
                    is_anomaly: score.is_some_and(|d| d.abs() >= self.threshold),
                }
            })
            .collect();

        debug!(
            points = scored.len(),
            evaluated = scored.iter().filter(|p| p.reference.is_some()).count(),
            flagged = scored.iter().filter(|p| p.is_anomaly).count(),
            window = self.window,
            threshold = self.threshold,
            "rolling detection complete"
        );

        Ok(scored)
    }
}

/// Flag points at least `threshold` trailing standard deviations from the
/// mean of the `window` points before them
pub fn detect_rolling(
    series: &[DailySeriesPoint],
    window: usize,
    threshold: f64,
) -> Result<Vec<AnomalyResult>, AnalysisError> {
    RollingDetector::new(window, threshold)?.detect(series)
}
