//! Pincode volume detector
//!
//! Flags pincodes whose total enrolments exceed a percentile of all pincode
//! totals in the input.

use crate::aggregator::aggregate_by_pincode;
use crate::error::AnalysisError;
use crate::stats;
use crate::types::EnrolmentRecord;
use serde::{Deserialize, Serialize};

/// Volume assessment for one pincode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PincodeVolume {
    pub pincode: u32,
    pub total_enrolments: u64,
    /// Percentile rank among all pincodes (0-100]
    pub percentile: f64,
    pub is_high_volume: bool,
}

/// Rank pincodes by total volume, flagging those above `percentile`
///
/// Results are ordered by total, largest first.
pub fn detect_pincode_volume<'a, I>(records: I, percentile: f64) -> Result<Vec<PincodeVolume>, AnalysisError>
where
    I: IntoIterator<Item = &'a EnrolmentRecord>,
{
    if !(percentile > 0.0 && percentile <= 100.0) {
        return Err(AnalysisError::invalid_parameter(
            "percentile",
            format!("must be in (0, 100], got {percentile}"),
        ));
    }

    let totals = aggregate_by_pincode(records);
    let values: Vec<f64> = totals.iter().map(|t| t.total_enrolments as f64).collect();
    let Some(cutoff) = stats::percentile(&values, percentile) else {
        return Ok(Vec::new());
    };
    let ranks = stats::percentile_ranks(&values);

    Ok(totals
        .iter()
        .zip(ranks)
        .map(|(total, rank)| PincodeVolume {
            pincode: total.pincode,
            total_enrolments: total.total_enrolments,
            percentile: rank,
            is_high_volume: total.total_enrolments as f64 > cutoff,
        })
        .collect())
}
