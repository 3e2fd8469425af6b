//! Loaded datasets and the current-dataset cell
//!
//! A `Dataset` is immutable once built. `DatasetStore` holds the active one
//! behind a versioned reference that is replaced whole on every load, so a
//! reader holding a snapshot never sees rows from two different loads.

use crate::error::AnalysisError;
use crate::schema::{RawTable, RecordValidator};
use crate::types::{AgeBreakdown, DateRange, EnrolmentRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Metadata derived from a dataset's records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub total_records: usize,
    /// `None` only for a dataset with no records
    pub date_range: Option<DateRange>,
    pub districts: Vec<String>,
    pub states: Vec<String>,
    pub pincodes_count: usize,
}

impl DatasetInfo {
    fn from_records(records: &[EnrolmentRecord]) -> Self {
        let start = records.iter().map(|r| r.date).min();
        let end = records.iter().map(|r| r.date).max();
        let date_range = match (start, end) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        };

        let districts: BTreeSet<&str> = records.iter().map(|r| r.district.as_str()).collect();
        let states: BTreeSet<&str> = records.iter().map(|r| r.state.as_str()).collect();
        let pincodes: BTreeSet<u32> = records.iter().map(|r| r.pincode).collect();

        Self {
            total_records: records.len(),
            date_range,
            districts: districts.into_iter().map(str::to_string).collect(),
            states: states.into_iter().map(str::to_string).collect(),
            pincodes_count: pincodes.len(),
        }
    }
}

/// An immutable, validated set of enrolment records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<EnrolmentRecord>,
    info: DatasetInfo,
}

impl Dataset {
    /// Build a dataset from already validated records
    ///
    /// Fails if the enrolment counts summed over all records would overflow,
    /// so every subset of a dataset can be summed without overflow.
    pub fn from_records(records: Vec<EnrolmentRecord>) -> Result<Self, AnalysisError> {
        check_grand_total(&records)?;
        let info = DatasetInfo::from_records(&records);
        Ok(Self { records, info })
    }

    pub fn records(&self) -> &[EnrolmentRecord] {
        &self.records
    }

    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Validate a raw table and build a dataset from it
pub fn load(table: &RawTable) -> Result<Dataset, AnalysisError> {
    let records = RecordValidator::validate(table)?;
    Dataset::from_records(records)
}

fn check_grand_total(records: &[EnrolmentRecord]) -> Result<(), AnalysisError> {
    let mut sum = AgeBreakdown::default();
    for (idx, record) in records.iter().enumerate() {
        sum = sum
            .checked_add(&record.age_breakdown())
            .ok_or_else(|| AnalysisError::ValidationError {
                row: idx + 1,
                column: "total".to_string(),
                reason: "enrolment counts overflow the dataset total".to_string(),
            })?;
    }
    Ok(())
}

/// Immutable view of the store at one point in time
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub version: u64,
    pub dataset: Arc<Dataset>,
}

#[derive(Debug, Default)]
struct Slot {
    version: u64,
    current: Option<Arc<Dataset>>,
}

/// Holder of the single active dataset
///
/// Loads validate first and only then swap the reference, so a failed load
/// leaves the previous dataset in place.
#[derive(Debug, Default)]
pub struct DatasetStore {
    slot: RwLock<Slot>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `table` and make it the active dataset
    pub fn load(&self, table: &RawTable) -> Result<DatasetSnapshot, AnalysisError> {
        match load(table) {
            Ok(dataset) => Ok(self.replace(dataset)),
            Err(e) => {
                warn!(error = %e, "rejected dataset load; keeping previous dataset");
                Err(e)
            }
        }
    }

    /// Make `dataset` the active dataset, returning the new snapshot
    pub fn replace(&self, dataset: Dataset) -> DatasetSnapshot {
        let dataset = Arc::new(dataset);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.version += 1;
        slot.current = Some(Arc::clone(&dataset));

        info!(
            version = slot.version,
            records = dataset.len(),
            pincodes = dataset.info().pincodes_count,
            "dataset loaded"
        );

        DatasetSnapshot {
            version: slot.version,
            dataset,
        }
    }

    /// Current dataset, or `NoDataset` before the first load
    pub fn snapshot(&self) -> Result<DatasetSnapshot, AnalysisError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.current
            .as_ref()
            .map(|dataset| DatasetSnapshot {
                version: slot.version,
                dataset: Arc::clone(dataset),
            })
            .ok_or(AnalysisError::NoDataset)
    }

    /// Number of successful loads so far
    pub fn version(&self) -> u64 {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version
    }

    pub fn is_loaded(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .is_some()
    }

    /// Drop the active dataset; the version counter keeps increasing
    pub fn reset(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.version += 1;
        slot.current = None;
        info!(version = slot.version, "dataset reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::thread;

    fn table_for(day: u32, count: usize, age: i64) -> RawTable {
        let rows: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "date": format!("{:02}-03-2025", day),
                    "state": "West Bengal",
                    "district": "Birbhum",
                    "pincode": 731100 + i as u32,
                    "age_0_5": age,
                    "age_5_17": age,
                    "age_18_greater": age,
                })
            })
            .collect();
        RawTable::from_json_rows(&serde_json::to_string(&rows).unwrap()).unwrap()
    }

    #[test]
    fn test_load_builds_info() {
        let dataset = load(&table_for(5, 3, 1)).unwrap();
        let info = dataset.info();
        assert_eq!(info.total_records, 3);
        assert_eq!(info.pincodes_count, 3);
        assert_eq!(info.districts, vec!["Birbhum"]);
        assert_eq!(
            info.date_range.unwrap().start,
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_row_total_overflow_rejected() {
        let huge = i64::MAX;
        let err = load(&table_for(1, 1, huge)).unwrap_err();
        match err {
            AnalysisError::ValidationError { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "total");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dataset_total_overflow_rejected() {
        // Each row fits on its own; the running sum does not
        let third = u64::MAX / 3;
        let records: Vec<EnrolmentRecord> = (0..4)
            .map(|i| EnrolmentRecord {
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                state: "West Bengal".to_string(),
                district: "Birbhum".to_string(),
                pincode: 731101 + i,
                age_0_5: 0,
                age_5_17: 0,
                age_18_greater: third,
            })
            .collect();

        assert!(matches!(
            Dataset::from_records(records[..3].to_vec()),
            Ok(ref d) if d.len() == 3
        ));
        match Dataset::from_records(records) {
            Err(AnalysisError::ValidationError { row, .. }) => assert_eq!(row, 4),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_store_starts_unloaded() {
        let store = DatasetStore::new();
        assert!(!store.is_loaded());
        assert!(matches!(store.snapshot(), Err(AnalysisError::NoDataset)));
    }

    #[test]
    fn test_failed_load_keeps_previous() {
        let store = DatasetStore::new();
        store.load(&table_for(1, 2, 1)).unwrap();

        let result = store.load(&table_for(2, 2, -1));
        assert!(matches!(result, Err(AnalysisError::ValidationError { .. })));

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.dataset.len(), 2);
        assert_eq!(snapshot.dataset.records()[0].date.to_string(), "2025-03-01");
    }

    #[test]
    fn test_reset_returns_to_unloaded() {
        let store = DatasetStore::new();
        store.load(&table_for(1, 1, 1)).unwrap();
        store.reset();
        assert!(!store.is_loaded());
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let store = DatasetStore::new();
        store.load(&table_for(1, 2, 1)).unwrap();
        let old = store.snapshot().unwrap();

        store.load(&table_for(2, 5, 2)).unwrap();
        let new = store.snapshot().unwrap();

        assert_eq!(old.dataset.len(), 2);
        assert_eq!(new.dataset.len(), 5);
        assert!(new.version > old.version);
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_rows() {
        let store = Arc::new(DatasetStore::new());
        store.load(&table_for(1, 4, 1)).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = store.snapshot().unwrap();
                        let records = snapshot.dataset.records();
                        let first = &records[0];
                        // Every load is uniform in date and counts
                        assert!(records
                            .iter()
                            .all(|r| r.date == first.date && r.age_0_5 == first.age_0_5));
                        assert_eq!(records.len(), snapshot.dataset.info().total_records);
                    }
                })
            })
            .collect();

        for i in 0..20u32 {
            let day = 2 + (i % 20);
            store.load(&table_for(day, 4 + i as usize, i as i64 + 2)).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
