//! Anomaly detectors
//!
//! Each detector scores a daily series against a reference distribution and
//! flags points whose absolute score reaches the configured threshold. Every
//! flagged point carries the reference statistics and a written explanation.

mod pincode;
mod rolling;
mod zscore;

pub use pincode::{detect_pincode_volume, PincodeVolume};
pub use rolling::{detect_rolling, RollingDetector};
pub use zscore::{detect_zscore, ZScoreDetector};

use crate::error::AnalysisError;
use crate::explain::explain;
use crate::types::{AnomalyResult, DailySeriesPoint, Direction, Method, ReferenceStats};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Score of one series point, flagged or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub date: NaiveDate,
    pub value: u64,
    /// `None` when the point was not evaluated or could not be scored
    pub score: Option<f64>,
    /// `None` when the point was not evaluated
    pub reference: Option<ReferenceStats>,
    pub is_anomaly: bool,
}

/// Trait for series anomaly detectors
pub trait AnomalyDetector {
    fn method(&self) -> Method;

    fn threshold(&self) -> f64;

    /// Score every point of `series`
    fn score(&self, series: &[DailySeriesPoint]) -> Result<Vec<ScoredPoint>, AnalysisError>;

    /// Flagged points only, each with its explanation
    fn detect(&self, series: &[DailySeriesPoint]) -> Result<Vec<AnomalyResult>, AnalysisError> {
        Ok(flagged(self.method(), &self.score(series)?))
    }
}

/// Explained results for the flagged points of an already scored series
pub fn flagged(method: Method, scored: &[ScoredPoint]) -> Vec<AnomalyResult> {
    scored
        .iter()
        .filter(|p| p.is_anomaly)
        .filter_map(|p| match (p.score, p.reference) {
            (Some(score), Some(reference)) => Some(flag(method, p.date, p.value, score, reference)),
            _ => None,
        })
        .collect()
}

/// Build an explained anomaly result
pub(crate) fn flag(
    method: Method,
    date: NaiveDate,
    value: u64,
    score: f64,
    reference: ReferenceStats,
) -> AnomalyResult {
    let mut result = AnomalyResult {
        date,
        observed_value: value,
        method,
        score,
        direction: Direction::from_score(score),
        reference,
        explanation: String::new(),
    };
    result.explanation = explain(&result, &reference);
    result
}

/// Rolling comparison needs strictly increasing dates
pub(crate) fn ensure_sorted(series: &[DailySeriesPoint]) -> Result<(), AnalysisError> {
    if let Some(pair) = series.windows(2).find(|w| w[0].date >= w[1].date) {
        return Err(AnalysisError::invalid_parameter(
            "series",
            format!(
                "must be sorted by date without duplicates ({} is followed by {})",
                pair[0].date, pair[1].date
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::{AgeBreakdown, DailySeriesPoint};
    use chrono::{Days, NaiveDate};
    use std::collections::BTreeSet;

    /// Consecutive daily points starting 2025-01-01
    pub fn series(values: &[u64]) -> Vec<DailySeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                DailySeriesPoint::new(
                    start + Days::new(i as u64),
                    AgeBreakdown {
                        age_0_5: 0,
                        age_5_17: 0,
                        age_18_greater: value,
                    },
                    BTreeSet::from([731101]),
                )
            })
            .collect()
    }
}
