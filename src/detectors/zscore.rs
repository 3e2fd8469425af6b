//! Global z-score detector
//!
//! Treats the whole period as one distribution: every point is scored against
//! the mean and sample standard deviation of the entire series.

use crate::config::{validate_threshold, DEFAULT_THRESHOLD};
use crate::error::AnalysisError;
use crate::stats;
use crate::types::{AnomalyResult, DailySeriesPoint, Method, ReferenceScope, ReferenceStats};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnomalyDetector, ScoredPoint};

/// Z-score detector over the global series distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreDetector {
    threshold: f64,
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ZScoreDetector {
    pub fn new(threshold: f64) -> Result<Self, AnalysisError> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    /// Global reference statistics for `series`
    pub fn reference(series: &[DailySeriesPoint]) -> Option<ReferenceStats> {
        let values: Vec<f64> = series.iter().map(|p| p.total_enrolments as f64).collect();
        let mean = stats::mean(&values)?;
        Some(ReferenceStats {
            scope: ReferenceScope::Global,
            mean,
            std_dev: stats::sample_std_dev(&values),
            sample_size: values.len(),
        })
    }
}

impl AnomalyDetector for ZScoreDetector {
    fn method(&self) -> Method {
        Method::Zscore
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, series: &[DailySeriesPoint]) -> Result<Vec<ScoredPoint>, AnalysisError> {
        // Fewer than two points have no sample spread to measure against
        let reference = Self::reference(series).filter(|r| r.sample_size >= 2);

        let scored: Vec<ScoredPoint> = series
            .iter()
            .map(|point| {
                let value = point.total_enrolments;
                let score = reference.and_then(|r| stats::z_score(value as f64, r.mean, r.std_dev));
                ScoredPoint {
                    date: point.date,
                    value,
                    score,
                    reference,
                    is_anomaly: score.is_some_and(|z| z.abs() >= self.threshold),
                }
            })
            .collect();

        debug!(
            points = scored.len(),
            flagged = scored.iter().filter(|p| p.is_anomaly).count(),
            threshold = self.threshold,
            "z-score detection complete"
        );

        Ok(scored)
    }
}

/// Flag points at least `threshold` global standard deviations from the mean
pub fn detect_zscore(series: &[DailySeriesPoint], threshold: f64) -> Result<Vec<AnomalyResult>, AnalysisError> {
    ZScoreDetector::new(threshold)?.detect(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::series;
    use crate::types::Direction;

    #[test]
    fn test_single_outlier_flagged_high() {
        let mut values = vec![100; 9];
        values.push(1000);
        let anomalies = detect_zscore(&series(&values), 2.5).unwrap();

        assert_eq!(anomalies.len(), 1);
        let anomaly = &anomalies[0];
        assert_eq!(anomaly.observed_value, 1000);
        assert_eq!(anomaly.direction, Direction::High);
        assert_eq!(anomaly.method, Method::Zscore);
        assert_eq!(anomaly.reference.mean, 190.0);
        // sigma = sqrt(729000 / 9)
        let expected = 810.0 / 81000.0f64.sqrt();
        assert!((anomaly.score - expected).abs() < 1e-9);
        assert!(anomaly.explanation.contains("significantly higher"));
    }

    #[test]
    fn test_constant_series_never_flags() {
        let flat = series(&[250; 12]);
        for threshold in [0.001, 1.0, 2.5, 10.0] {
            assert!(detect_zscore(&flat, threshold).unwrap().is_empty());
        }
    }

    #[test]
    fn test_low_direction() {
        let mut values = vec![1000; 9];
        values.push(10);
        let anomalies = detect_zscore(&series(&values), 2.5).unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].direction, Direction::Low);
        assert!(anomalies[0].score < 0.0);
    }

    #[test]
    fn test_every_point_scored() {
        let scored = ZScoreDetector::default().score(&series(&[1, 2, 3, 4])).unwrap();
        assert_eq!(scored.len(), 4);
        assert!(scored.iter().all(|p| p.score.is_some()));
    }

    #[test]
    fn test_short_series_yields_nothing() {
        assert!(detect_zscore(&series(&[5]), 2.5).unwrap().is_empty());
        assert!(detect_zscore(&[], 2.5).unwrap().is_empty());
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // Values 0 and 2: mean 1, sample sigma sqrt(2), |z| = 1/sqrt(2)
        let boundary = 1.0 / 2.0f64.sqrt();
        let anomalies = detect_zscore(&series(&[0, 2]), boundary).unwrap();
        assert_eq!(anomalies.len(), 2);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(matches!(
            detect_zscore(&series(&[1, 2]), -1.0),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }
}
