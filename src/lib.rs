//! Enrolment Insight - explainable statistics and anomaly detection for daily
//! enrolment records
//!
//! Raw tabular rows are validated once into typed records, held in a
//! versioned dataset cell, and analysed through a deterministic pipeline:
//! filter → daily aggregation → descriptive statistics → anomaly detection
//! → written explanations.
//!
//! ## Modules
//!
//! - **Schema**: required columns and row validation
//! - **Dataset**: immutable datasets and the atomically swapped current dataset
//! - **Detectors**: global z-score, trailing-window and pincode volume detectors
//! - **Correlation**: pairwise coefficients between age buckets, totals and calendar fields
//! - **Pipeline**: descriptive and anomaly reports bundling every stage

pub mod aggregator;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod describe;
pub mod detectors;
pub mod error;
pub mod explain;
pub mod filter;
pub mod geography;
pub mod pipeline;
pub mod schema;
pub mod stats;
pub mod temporal;
pub mod types;

pub use aggregator::aggregate;
pub use config::{AnalysisConfig, DetectorConfig};
pub use dataset::{load, Dataset, DatasetInfo, DatasetSnapshot, DatasetStore};
pub use describe::describe;
pub use detectors::{detect_pincode_volume, detect_rolling, detect_zscore, AnomalyDetector};
pub use error::AnalysisError;
pub use explain::explain;
pub use filter::{filter, FilteredView};
pub use correlation::{correlation_matrix, CorrelationAnalysis};
pub use pipeline::{AnalysisEngine, AnalysisReport, AnomalyReport, Explanation};

// Schema exports
pub use schema::{RawCell, RawTable, RecordValidator, REQUIRED_COLUMNS};

pub use types::{
    AnomalyResult, DailySeriesPoint, DateRange, Direction, EnrolmentRecord, FilterSpec, Method, ReferenceStats,
    SummaryStatistics,
};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "enrolment-insight";
