//! Filter/view engine
//!
//! Narrows a dataset by inclusive date range and pincode set. Views borrow the
//! dataset's records and never modify them.

use crate::dataset::Dataset;
use crate::error::AnalysisError;
use crate::types::{EnrolmentRecord, FilterSpec};
use tracing::debug;

/// Read-only subset of a dataset
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    records: Vec<&'a EnrolmentRecord>,
    spec: FilterSpec,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a EnrolmentRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a EnrolmentRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for views returned by [`filter`]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Apply `spec` to `dataset`
///
/// Fails with `EmptyResult` when no record matches, including when the
/// dataset itself is empty.
pub fn filter<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> Result<FilteredView<'a>, AnalysisError> {
    if let (Some(start), Some(end)) = (spec.start_date, spec.end_date) {
        if start > end {
            return Err(AnalysisError::invalid_parameter(
                "start_date",
                format!("{start} is after end_date {end}"),
            ));
        }
    }

    let records: Vec<&EnrolmentRecord> = dataset.records().iter().filter(|r| spec.matches(r)).collect();

    debug!(
        matched = records.len(),
        total = dataset.len(),
        filter = %spec,
        "applied filter"
    );

    if records.is_empty() {
        return Err(AnalysisError::EmptyResult(spec.to_string()));
    }

    Ok(FilteredView {
        records,
        spec: spec.clone(),
    })
}
