//! Correlations between age buckets, totals and calendar fields
//!
//! Computed over individual records. Pairs involving a constant column have no
//! defined coefficient and are reported as `None`.

use crate::stats;
use crate::types::EnrolmentRecord;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Absolute coefficient above which a pair is reported as strong
pub const STRONG_CORRELATION: f64 = 0.7;

/// Variables entering the matrix, in row/column order
pub const CORRELATION_VARIABLES: [&str; 7] = [
    "age_0_5",
    "age_5_17",
    "age_18_greater",
    "total_enrolments",
    "month",
    "day",
    "week_of_year",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongCorrelation {
    pub var1: String,
    pub var2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalysis {
    pub variables: Vec<String>,
    /// Square matrix indexed like `variables`
    pub matrix: Vec<Vec<Option<f64>>>,
    /// Pairs with |r| above [`STRONG_CORRELATION`], upper triangle only
    pub strong_correlations: Vec<StrongCorrelation>,
}

fn columns(record: &EnrolmentRecord) -> [f64; 7] {
    [
        record.age_0_5 as f64,
        record.age_5_17 as f64,
        record.age_18_greater as f64,
        record.total() as f64,
        record.date.month() as f64,
        record.date.day() as f64,
        record.date.iso_week().week() as f64,
    ]
}

/// Pearson correlation matrix over `records`
pub fn correlation_matrix<'a, I>(records: I) -> CorrelationAnalysis
where
    I: IntoIterator<Item = &'a EnrolmentRecord>,
{
    let mut data: [Vec<f64>; 7] = Default::default();
    for record in records {
        for (column, value) in data.iter_mut().zip(columns(record)) {
            column.push(value);
        }
    }

    let n = CORRELATION_VARIABLES.len();
    let matrix: Vec<Vec<Option<f64>>> = (0..n)
        .map(|i| (0..n).map(|j| stats::pearson(&data[i], &data[j])).collect())
        .collect();

    let mut strong_correlations = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(r) = matrix[i][j].filter(|r| r.abs() > STRONG_CORRELATION) {
                strong_correlations.push(StrongCorrelation {
                    var1: CORRELATION_VARIABLES[i].to_string(),
                    var2: CORRELATION_VARIABLES[j].to_string(),
                    correlation: r,
                });
            }
        }
    }

    CorrelationAnalysis {
        variables: CORRELATION_VARIABLES.iter().map(|v| v.to_string()).collect(),
        matrix,
        strong_correlations,
    }
}
