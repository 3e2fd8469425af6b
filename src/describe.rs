//! Descriptive statistics over a daily series

use crate::error::AnalysisError;
use crate::stats;
use crate::types::{AgeBreakdown, AgeBucket, DailySeriesPoint, DateRange, SummaryStatistics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Summarise a non-empty daily series
pub fn describe(series: &[DailySeriesPoint]) -> Result<SummaryStatistics, AnalysisError> {
    let first = series.first().ok_or(AnalysisError::EmptySeries)?;

    let values: Vec<f64> = series.iter().map(|p| p.total_enrolments as f64).collect();
    let mut start = first.date;
    let mut end = first.date;
    let mut min = first.total_enrolments;
    let mut max = first.total_enrolments;
    let mut total = 0u64;
    let mut pincodes: BTreeSet<u32> = BTreeSet::new();

    for point in series {
        start = start.min(point.date);
        end = end.max(point.date);
        min = min.min(point.total_enrolments);
        max = max.max(point.total_enrolments);
        total = total.saturating_add(point.total_enrolments);
        pincodes.extend(point.pincodes().iter().copied());
    }

    Ok(SummaryStatistics {
        total_enrolments: total,
        days: series.len(),
        mean: stats::mean(&values).unwrap_or(0.0),
        median: stats::median(&values).unwrap_or(0.0),
        std_dev: stats::sample_std_dev(&values),
        min,
        max,
        unique_pincodes: pincodes.len(),
        date_range: DateRange { start, end },
    })
}

/// Count and share of one age bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeShare {
    pub bucket: AgeBucket,
    pub label: String,
    pub count: u64,
    /// Percentage of all enrolments (0 when there are none)
    pub percentage: f64,
}

/// Age bucket totals across a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeDistribution {
    pub total_enrolments: u64,
    pub buckets: Vec<AgeShare>,
}

/// Sum each age bucket over the series and express it as a share of the total
pub fn age_distribution(series: &[DailySeriesPoint]) -> AgeDistribution {
    let mut totals = AgeBreakdown::default();
    for point in series {
        totals.add(&point.age_breakdown);
    }
    let total = totals.total();

    let buckets = AgeBucket::ALL
        .iter()
        .map(|&bucket| {
            let count = totals.get(bucket);
            let percentage = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            AgeShare {
                bucket,
                label: bucket.label().to_string(),
                count,
                percentage,
            }
        })
        .collect();

    AgeDistribution {
        total_enrolments: total,
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::types::EnrolmentRecord;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn point(day: u32, total: u64, pincodes: usize) -> DailySeriesPoint {
        DailySeriesPoint::new(
            NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            AgeBreakdown {
                age_0_5: total,
                age_5_17: 0,
                age_18_greater: 0,
            },
            (0..pincodes as u32).collect(),
        )
    }

    #[test]
    fn test_empty_series_fails() {
        assert!(matches!(describe(&[]), Err(AnalysisError::EmptySeries)));
    }

    #[test]
    fn test_summary_fields() {
        let series = vec![point(1, 10, 2), point(2, 20, 3), point(3, 30, 1), point(4, 100, 2)];
        let summary = describe(&series).unwrap();

        assert_eq!(summary.total_enrolments, 160);
        assert_eq!(summary.days, 4);
        assert_eq!(summary.mean, 40.0);
        assert_eq!(summary.median, 25.0);
        assert_eq!(summary.min, 10);
        assert_eq!(summary.max, 100);
        assert_eq!(summary.date_range.days(), 3);
        // sample variance = (900 + 400 + 100 + 3600) / 3
        assert!((summary.std_dev - (5000.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_has_zero_std() {
        let summary = describe(&[point(7, 55, 1)]).unwrap();
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.mean, 55.0);
        assert_eq!(summary.median, 55.0);
    }

    #[test]
    fn test_distinct_pincodes_across_series() {
        let records: Vec<EnrolmentRecord> = [(1, 11), (1, 12), (2, 13)]
            .into_iter()
            .map(|(day, pincode)| EnrolmentRecord {
                date: NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
                state: "S".to_string(),
                district: "D".to_string(),
                pincode,
                age_0_5: 1,
                age_5_17: 1,
                age_18_greater: 1,
            })
            .collect();
        let series = aggregate(&records);

        assert_eq!(series[0].pincode_count(), 2);
        assert_eq!(describe(&series).unwrap().unique_pincodes, 3);

        let json = serde_json::to_string(&series).unwrap();
        let restored: Vec<DailySeriesPoint> = serde_json::from_str(&json).unwrap();
        assert_eq!(describe(&restored).unwrap().unique_pincodes, 3);
    }

    #[test]
    fn test_age_distribution_percentages() {
        let a = DailySeriesPoint::new(
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            AgeBreakdown {
                age_0_5: 25,
                age_5_17: 25,
                age_18_greater: 50,
            },
            BTreeSet::from([1]),
        );

        let dist = age_distribution(&[a]);
        let shares: Vec<f64> = dist.buckets.iter().map(|b| b.percentage).collect();
        assert_eq!(shares, vec![25.0, 25.0, 50.0]);
        assert_eq!(dist.buckets[2].label, "18+ years");

        let empty = age_distribution(&[]);
        assert!(empty.buckets.iter().all(|b| b.percentage == 0.0));
    }
}
