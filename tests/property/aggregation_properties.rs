use chrono::{Days, NaiveDate};
use enrolment_insight::detectors::{RollingDetector, ZScoreDetector};
use enrolment_insight::{aggregate, describe, AnomalyDetector, EnrolmentRecord};
use proptest::prelude::*;

fn record((day, pincode, a, b, c): (u64, u32, u64, u64, u64)) -> EnrolmentRecord {
    EnrolmentRecord {
        date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Days::new(day),
        state: "Assam".to_string(),
        district: "Kamrup".to_string(),
        pincode,
        age_0_5: a,
        age_5_17: b,
        age_18_greater: c,
    }
}

fn records() -> impl Strategy<Value = Vec<EnrolmentRecord>> {
    prop::collection::vec(
        (0u64..30, 781000u32..781020, 0u64..500, 0u64..500, 0u64..500).prop_map(record),
        1..120,
    )
}

proptest! {
    #[test]
    fn aggregation_ignores_input_order(recs in records()) {
        let mut reversed = recs.clone();
        reversed.reverse();
        prop_assert_eq!(aggregate(&recs), aggregate(&reversed));
    }

    #[test]
    fn daily_totals_conserve_record_totals(recs in records()) {
        let series = aggregate(&recs);
        let from_series: u64 = series.iter().map(|p| p.total_enrolments).sum();
        let from_records: u64 = recs.iter().map(|r| r.total()).sum();
        prop_assert_eq!(from_series, from_records);
        for point in &series {
            prop_assert_eq!(point.total_enrolments, point.age_breakdown.total());
        }
    }

    #[test]
    fn series_dates_strictly_increase(recs in records()) {
        let series = aggregate(&recs);
        prop_assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn summary_bounds_hold(recs in records()) {
        let summary = describe(&aggregate(&recs)).unwrap();
        prop_assert!(summary.min as f64 <= summary.mean + 1e-9);
        prop_assert!(summary.mean <= summary.max as f64 + 1e-9);
        prop_assert!(summary.std_dev >= 0.0);
    }

    #[test]
    fn constant_series_never_flagged(value in 0u64..10_000, days in 2u64..40) {
        let recs: Vec<EnrolmentRecord> = (0..days).map(|d| record((d, 781001, 0, 0, value))).collect();
        let series = aggregate(&recs);
        prop_assert!(ZScoreDetector::default().detect(&series).unwrap().is_empty());
        prop_assert!(RollingDetector::default().detect(&series).unwrap().is_empty());
    }
}
