//! Temporal and geographic aggregation
//!
//! Groups records into one `DailySeriesPoint` per date present in the input.
//! Missing dates are not synthesized; results do not depend on input order.

use crate::types::{AgeBreakdown, DailySeriesPoint, EnrolmentRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Per-pincode totals over the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PincodeTotal {
    pub pincode: u32,
    pub total_enrolments: u64,
    pub age_breakdown: AgeBreakdown,
    pub num_records: usize,
}

/// Per-district totals over the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictTotal {
    pub district: String,
    pub total_enrolments: u64,
    pub unique_pincodes: usize,
}

#[derive(Default)]
struct DayAccumulator {
    ages: AgeBreakdown,
    pincodes: BTreeSet<u32>,
}

/// Roll records up into a date-ascending daily series
pub fn aggregate<'a, I>(records: I) -> Vec<DailySeriesPoint>
where
    I: IntoIterator<Item = &'a EnrolmentRecord>,
{
    let mut by_date: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for record in records {
        let day = by_date.entry(record.date).or_default();
        day.ages.add(&record.age_breakdown());
        day.pincodes.insert(record.pincode);
    }

    by_date
        .into_iter()
        .map(|(date, day)| DailySeriesPoint::new(date, day.ages, day.pincodes))
        .collect()
}

/// Per-pincode totals, largest first (ties by ascending pincode)
pub fn aggregate_by_pincode<'a, I>(records: I) -> Vec<PincodeTotal>
where
    I: IntoIterator<Item = &'a EnrolmentRecord>,
{
    let mut by_pincode: BTreeMap<u32, (AgeBreakdown, usize)> = BTreeMap::new();

    for record in records {
        let (ages, count) = by_pincode.entry(record.pincode).or_default();
        ages.add(&record.age_breakdown());
        *count += 1;
    }

    let mut totals: Vec<PincodeTotal> = by_pincode
        .into_iter()
        .map(|(pincode, (ages, num_records))| PincodeTotal {
            pincode,
            total_enrolments: ages.total(),
            age_breakdown: ages,
            num_records,
        })
        .collect();

    totals.sort_by_key(|t| (Reverse(t.total_enrolments), t.pincode));
    totals
}

/// Per-district totals, ordered by district name
pub fn aggregate_by_district<'a, I>(records: I) -> Vec<DistrictTotal>
where
    I: IntoIterator<Item = &'a EnrolmentRecord>,
{
    let mut by_district: BTreeMap<&str, (u64, BTreeSet<u32>)> = BTreeMap::new();

    for record in records {
        let (total, pincodes) = by_district.entry(record.district.as_str()).or_default();
        *total = total.saturating_add(record.total());
        pincodes.insert(record.pincode);
    }

    by_district
        .into_iter()
        .map(|(district, (total_enrolments, pincodes))| DistrictTotal {
            district: district.to_string(),
            total_enrolments,
            unique_pincodes: pincodes.len(),
        })
        .collect()
}
