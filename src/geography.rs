//! Geographic profile of a record set

use crate::aggregator::{aggregate_by_district, aggregate_by_pincode, DistrictTotal, PincodeTotal};
use crate::types::EnrolmentRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographicProfile {
    pub total_pincodes: usize,
    /// Largest pincodes first, at most `top_n`
    pub top_pincodes: Vec<PincodeTotal>,
    pub districts: Vec<DistrictTotal>,
    /// Percentage of all enrolments held by `top_pincodes`
    pub top_share_percentage: f64,
}

/// Pincode and district roll-ups with the concentration of the top `top_n`
pub fn geographic_profile<'a, I>(records: I, top_n: usize) -> GeographicProfile
where
    I: IntoIterator<Item = &'a EnrolmentRecord>,
    I::IntoIter: Clone,
{
    let records = records.into_iter();
    let mut pincodes = aggregate_by_pincode(records.clone());
    let districts = aggregate_by_district(records);

    let total = pincodes.iter().fold(0u64, |acc, p| acc.saturating_add(p.total_enrolments));
    let total_pincodes = pincodes.len();
    pincodes.truncate(top_n);
    let top = pincodes.iter().fold(0u64, |acc, p| acc.saturating_add(p.total_enrolments));

    GeographicProfile {
        total_pincodes,
        top_pincodes: pincodes,
        districts,
        top_share_percentage: if total > 0 {
            top as f64 / total as f64 * 100.0
        } else {
            0.0
        },
    }
}
