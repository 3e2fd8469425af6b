//! Error types for Enrolment Insight

use thiserror::Error;

/// Errors that can occur while loading or analysing enrolment data
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Missing required columns: {}", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("Invalid value in row {row}, column '{column}': {reason}")]
    ValidationError {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Cannot compute statistics over an empty series")]
    EmptySeries,

    #[error("Filter matched no records: {0}")]
    EmptyResult(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("No dataset loaded")]
    NoDataset,

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Short machine-readable kind, stable across releases
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::SchemaError { .. } => "schema_error",
            AnalysisError::ValidationError { .. } => "validation_error",
            AnalysisError::EmptySeries => "empty_series",
            AnalysisError::EmptyResult(_) => "empty_result",
            AnalysisError::InvalidParameter { .. } => "invalid_parameter",
            AnalysisError::NoDataset => "no_dataset",
            AnalysisError::ParseError(_) => "parse_error",
            AnalysisError::JsonError(_) => "json_error",
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
