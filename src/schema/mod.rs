//! Enrolment table schema
//!
//! This module defines the raw tabular input handed over by the ingestion layer
//! and the validator that turns it into typed records.

mod raw_table;
mod validator;

pub use raw_table::*;
pub use validator::*;
