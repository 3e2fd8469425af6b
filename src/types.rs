//! Core types for the Enrolment Insight engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: validated records, daily aggregates, filters and anomaly results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Age bucket of an enrolment count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "age_0_5")]
    Age0To5,
    #[serde(rename = "age_5_17")]
    Age5To17,
    #[serde(rename = "age_18_greater")]
    Age18Plus,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 3] = [AgeBucket::Age0To5, AgeBucket::Age5To17, AgeBucket::Age18Plus];

    /// Column name used in source tables
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBucket::Age0To5 => "age_0_5",
            AgeBucket::Age5To17 => "age_5_17",
            AgeBucket::Age18Plus => "age_18_greater",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Age0To5 => "0-5 years",
            AgeBucket::Age5To17 => "5-17 years",
            AgeBucket::Age18Plus => "18+ years",
        }
    }
}

/// Enrolment counts per age bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBreakdown {
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
}

impl AgeBreakdown {
    pub fn get(&self, bucket: AgeBucket) -> u64 {
        match bucket {
            AgeBucket::Age0To5 => self.age_0_5,
            AgeBucket::Age5To17 => self.age_5_17,
            AgeBucket::Age18Plus => self.age_18_greater,
        }
    }

    /// Sum of all buckets, saturating at `u64::MAX`
    ///
    /// Datasets are checked at load time so their sums never saturate.
    pub fn total(&self) -> u64 {
        self.age_0_5
            .saturating_add(self.age_5_17)
            .saturating_add(self.age_18_greater)
    }

    /// Sum of all buckets, `None` on overflow
    pub fn checked_total(&self) -> Option<u64> {
        self.age_0_5
            .checked_add(self.age_5_17)?
            .checked_add(self.age_18_greater)
    }

    /// Add `other` bucket by bucket, saturating at `u64::MAX`
    pub fn add(&mut self, other: &AgeBreakdown) {
        self.age_0_5 = self.age_0_5.saturating_add(other.age_0_5);
        self.age_5_17 = self.age_5_17.saturating_add(other.age_5_17);
        self.age_18_greater = self.age_18_greater.saturating_add(other.age_18_greater);
    }

    /// Bucket-wise sum, `None` if any bucket or the total overflows
    pub fn checked_add(&self, other: &AgeBreakdown) -> Option<AgeBreakdown> {
        let sum = AgeBreakdown {
            age_0_5: self.age_0_5.checked_add(other.age_0_5)?,
            age_5_17: self.age_5_17.checked_add(other.age_5_17)?,
            age_18_greater: self.age_18_greater.checked_add(other.age_18_greater)?,
        };
        sum.checked_total().map(|_| sum)
    }
}

/// One validated row of source data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolmentRecord {
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    /// Postal area code
    pub pincode: u32,
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
}

impl EnrolmentRecord {
    /// Total enrolments across all age buckets
    pub fn total(&self) -> u64 {
        self.age_breakdown().total()
    }

    pub fn age_breakdown(&self) -> AgeBreakdown {
        AgeBreakdown {
            age_0_5: self.age_0_5,
            age_5_17: self.age_5_17,
            age_18_greater: self.age_18_greater,
        }
    }
}

/// Aggregate of all matching records for one calendar date
///
/// The total and the pincode count are derived from the breakdown and the
/// pincode set, including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DailySeriesPointRepr")]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub total_enrolments: u64,
    pub age_breakdown: AgeBreakdown,
    pincode_count: usize,
    pincodes: BTreeSet<u32>,
}

#[derive(Deserialize)]
struct DailySeriesPointRepr {
    date: NaiveDate,
    age_breakdown: AgeBreakdown,
    #[serde(default)]
    pincodes: BTreeSet<u32>,
}

impl From<DailySeriesPointRepr> for DailySeriesPoint {
    fn from(repr: DailySeriesPointRepr) -> Self {
        DailySeriesPoint::new(repr.date, repr.age_breakdown, repr.pincodes)
    }
}

impl DailySeriesPoint {
    pub fn new(date: NaiveDate, age_breakdown: AgeBreakdown, pincodes: BTreeSet<u32>) -> Self {
        Self {
            date,
            total_enrolments: age_breakdown.total(),
            age_breakdown,
            pincode_count: pincodes.len(),
            pincodes,
        }
    }

    /// Distinct pincodes contributing to this date
    pub fn pincode_count(&self) -> usize {
        self.pincode_count
    }

    pub fn pincodes(&self) -> &BTreeSet<u32> {
        &self.pincodes
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Days between start and end (0 for a single-day range)
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Constraints narrowing a dataset to a read-only view
///
/// Unset constraints place no restriction on their axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pincodes: Option<BTreeSet<u32>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn with_pincodes(mut self, pincodes: impl IntoIterator<Item = u32>) -> Self {
        self.pincodes = Some(pincodes.into_iter().collect());
        self
    }

    /// True when no axis is constrained
    pub fn is_unrestricted(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.pincodes.as_ref().map_or(true, |p| p.is_empty())
    }

    pub fn matches(&self, record: &EnrolmentRecord) -> bool {
        if let Some(start) = self.start_date {
            if record.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if record.date > end {
                return false;
            }
        }
        match &self.pincodes {
            Some(pincodes) if !pincodes.is_empty() => pincodes.contains(&record.pincode),
            _ => true,
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self
            .start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "*".to_string());
        let end = self
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "*".to_string());
        write!(f, "dates {start}..={end}")?;
        match &self.pincodes {
            Some(pincodes) if !pincodes.is_empty() => {
                let list: Vec<String> = pincodes.iter().map(|p| p.to_string()).collect();
                write!(f, ", pincodes [{}]", list.join(", "))
            }
            _ => write!(f, ", all pincodes"),
        }
    }
}

/// Detection method that produced an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Zscore,
    Rolling,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Zscore => "zscore",
            Method::Rolling => "rolling",
        }
    }

    /// Name of the score this method produces
    pub fn label(&self) -> &'static str {
        match self {
            Method::Zscore => "z-score",
            Method::Rolling => "rolling deviation",
        }
    }
}

/// Side of the reference mean an anomaly falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

impl Direction {
    /// `High` for positive scores, `Low` otherwise
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Direction::High
        } else {
            Direction::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::High => "high",
            Direction::Low => "low",
        }
    }
}

/// Reference distribution a score was measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceScope {
    /// Whole series
    Global,
    /// The `days` points immediately preceding the scored point
    Trailing { days: usize },
}

/// Statistics that produced an anomaly score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub scope: ReferenceScope,
    pub mean: f64,
    pub std_dev: f64,
    pub sample_size: usize,
}

/// One flagged date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub date: NaiveDate,
    pub observed_value: u64,
    pub method: Method,
    /// Signed deviation in standard deviations of the reference
    pub score: f64,
    pub direction: Direction,
    pub reference: ReferenceStats,
    pub explanation: String,
}

/// Fixed-shape summary of a daily series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_enrolments: u64,
    pub days: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (0 for a single day)
    pub std_dev: f64,
    pub min: u64,
    pub max: u64,
    pub unique_pincodes: usize,
    pub date_range: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, pincode: u32) -> EnrolmentRecord {
        EnrolmentRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            state: "West Bengal".to_string(),
            district: "Birbhum".to_string(),
            pincode,
            age_0_5: 3,
            age_5_17: 4,
            age_18_greater: 5,
        }
    }

    #[test]
    fn test_record_total_is_derived() {
        let mut r = record("2025-03-01", 731101);
        assert_eq!(r.total(), 12);
        r.age_18_greater = 0;
        assert_eq!(r.total(), 7);
    }

    #[test]
    fn test_filter_bounds_inclusive() {
        let spec = FilterSpec::new()
            .with_start_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .with_end_date(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());

        assert!(spec.matches(&record("2025-03-01", 1)));
        assert!(spec.matches(&record("2025-03-03", 1)));
        assert!(!spec.matches(&record("2025-02-28", 1)));
        assert!(!spec.matches(&record("2025-03-04", 1)));
    }

    #[test]
    fn test_empty_pincode_set_is_unrestricted() {
        let spec = FilterSpec::new().with_pincodes(Vec::new());
        assert!(spec.is_unrestricted());
        assert!(spec.matches(&record("2025-03-01", 42)));
    }

    #[test]
    fn test_breakdown_overflow_is_detected() {
        let huge = AgeBreakdown {
            age_0_5: i64::MAX as u64,
            age_5_17: i64::MAX as u64,
            age_18_greater: i64::MAX as u64,
        };
        assert_eq!(huge.checked_total(), None);
        assert_eq!(huge.total(), u64::MAX);
        assert_eq!(huge.checked_add(&AgeBreakdown::default()), None);

        let mut sum = huge;
        sum.add(&huge);
        assert_eq!(sum.age_0_5, u64::MAX);
    }

    #[test]
    fn test_daily_point_round_trip_keeps_pincodes() {
        let point = DailySeriesPoint::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            AgeBreakdown {
                age_0_5: 1,
                age_5_17: 2,
                age_18_greater: 3,
            },
            BTreeSet::from([731101, 731204]),
        );
        let json = serde_json::to_string(&point).unwrap();
        let back: DailySeriesPoint = serde_json::from_str(&json).unwrap();

        assert_eq!(back, point);
        assert_eq!(back.pincode_count(), 2);
        assert_eq!(back.total_enrolments, 6);
    }

    #[test]
    fn test_deserialized_point_derives_counts() {
        let json = r#"{"date": "2025-03-01", "total_enrolments": 99, "pincode_count": 7,
            "age_breakdown": {"age_0_5": 1, "age_5_17": 1, "age_18_greater": 1}, "pincodes": [5]}"#;
        let point: DailySeriesPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.total_enrolments, 3);
        assert_eq!(point.pincode_count(), 1);
    }

    #[test]
    fn test_direction_from_score() {
        assert_eq!(Direction::from_score(2.7), Direction::High);
        assert_eq!(Direction::from_score(-2.7), Direction::Low);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Method::Zscore).unwrap(), "\"zscore\"");
        assert_eq!(serde_json::to_string(&Direction::Low).unwrap(), "\"low\"");
        assert_eq!(
            serde_json::to_string(&AgeBucket::Age18Plus).unwrap(),
            "\"age_18_greater\""
        );
    }
}
