//! Schema and value validation for raw enrolment tables
//!
//! Converts a `RawTable` into typed `EnrolmentRecord`s. This is the only place
//! loosely typed cells are read.

use crate::error::AnalysisError;
use crate::schema::raw_table::{RawCell, RawTable};
use crate::types::EnrolmentRecord;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Date formats accepted in the `date` column, tried in order
pub const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y"];

static NULL_CELL: RawCell = RawCell::Null;

/// Resolved positions of the required columns
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    state: usize,
    district: usize,
    pincode: usize,
    age_0_5: usize,
    age_5_17: usize,
    age_18_greater: usize,
}

/// A value problem found in a single row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    /// 1-based data row number
    pub row: usize,
    pub column: String,
    pub reason: String,
}

impl From<RowIssue> for AnalysisError {
    fn from(issue: RowIssue) -> Self {
        AnalysisError::ValidationError {
            row: issue.row,
            column: issue.column,
            reason: issue.reason,
        }
    }
}

/// Validator producing typed records from raw tables
pub struct RecordValidator;

impl RecordValidator {
    /// Validate every row, failing on the first schema or value problem
    ///
    /// Records are returned in input order.
    pub fn validate(table: &RawTable) -> Result<Vec<EnrolmentRecord>, AnalysisError> {
        let columns = Self::check_schema(table)?;

        let mut records = Vec::with_capacity(table.len());
        for (idx, row) in table.rows().iter().enumerate() {
            let record = parse_row(idx + 1, row, &columns)?;
            records.push(record);
        }

        debug!(rows = records.len(), "validated enrolment table");
        Ok(records)
    }

    /// Collect every row-level issue instead of stopping at the first
    ///
    /// A schema problem is still returned as an error since no row can be read.
    pub fn validate_rows(table: &RawTable) -> Result<Vec<RowIssue>, AnalysisError> {
        let columns = Self::check_schema(table)?;

        Ok(table
            .rows()
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| parse_row(idx + 1, row, &columns).err())
            .collect())
    }

    fn check_schema(table: &RawTable) -> Result<ColumnMap, AnalysisError> {
        let missing = table.missing_columns();
        if !missing.is_empty() {
            return Err(AnalysisError::SchemaError { missing });
        }

        let position = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| AnalysisError::SchemaError {
                    missing: vec![name.to_string()],
                })
        };

        Ok(ColumnMap {
            date: position("date")?,
            state: position("state")?,
            district: position("district")?,
            pincode: position("pincode")?,
            age_0_5: position("age_0_5")?,
            age_5_17: position("age_5_17")?,
            age_18_greater: position("age_18_greater")?,
        })
    }
}

fn parse_row(row: usize, cells: &[RawCell], columns: &ColumnMap) -> Result<EnrolmentRecord, RowIssue> {
    let cell = |idx: usize| cells.get(idx).unwrap_or(&NULL_CELL);

    let record = EnrolmentRecord {
        date: parse_date(row, cell(columns.date))?,
        state: parse_text(row, "state", cell(columns.state))?,
        district: parse_text(row, "district", cell(columns.district))?,
        pincode: parse_pincode(row, cell(columns.pincode))?,
        age_0_5: parse_count(row, "age_0_5", cell(columns.age_0_5))?,
        age_5_17: parse_count(row, "age_5_17", cell(columns.age_5_17))?,
        age_18_greater: parse_count(row, "age_18_greater", cell(columns.age_18_greater))?,
    };

    if record.age_breakdown().checked_total().is_none() {
        return Err(issue(row, "total", "sum of age counts overflows"));
    }
    Ok(record)
}

fn issue(row: usize, column: &str, reason: impl Into<String>) -> RowIssue {
    RowIssue {
        row,
        column: column.to_string(),
        reason: reason.into(),
    }
}

/// Parse a calendar date in any of the accepted formats
pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

fn parse_date(row: usize, cell: &RawCell) -> Result<NaiveDate, RowIssue> {
    match cell {
        RawCell::Text(s) if !s.trim().is_empty() => parse_date_str(s)
            .ok_or_else(|| issue(row, "date", format!("unrecognised date '{}'", s.trim()))),
        _ if cell.is_null() => Err(issue(row, "date", "missing value")),
        other => Err(issue(row, "date", format!("expected a date, got {other:?}"))),
    }
}

fn parse_text(row: usize, column: &str, cell: &RawCell) -> Result<String, RowIssue> {
    cell.as_text()
        .ok_or_else(|| issue(row, column, "missing value"))
}

fn parse_pincode(row: usize, cell: &RawCell) -> Result<u32, RowIssue> {
    if cell.is_null() {
        return Err(issue(row, "pincode", "missing value"));
    }
    let value = cell
        .as_i64()
        .ok_or_else(|| issue(row, "pincode", format!("non-numeric value {cell:?}")))?;
    match u32::try_from(value) {
        Ok(0) | Err(_) => Err(issue(row, "pincode", format!("out of range value {value}"))),
        Ok(pincode) => Ok(pincode),
    }
}

fn parse_count(row: usize, column: &str, cell: &RawCell) -> Result<u64, RowIssue> {
    if cell.is_null() {
        return Err(issue(row, column, "missing value"));
    }
    let value = cell
        .as_i64()
        .ok_or_else(|| issue(row, column, format!("non-numeric value {cell:?}")))?;
    if value < 0 {
        return Err(issue(row, column, format!("negative value {value}")));
    }
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(json: &str) -> RawTable {
        RawTable::from_json_rows(json).unwrap()
    }

    #[test]
    fn test_validates_rows_in_order() {
        let records = RecordValidator::validate(&table(
            r#"[
                {"date": "02-03-2025", "state": "West Bengal", "district": "Birbhum", "pincode": 731101, "age_0_5": 4, "age_5_17": "2", "age_18_greater": 1},
                {"date": "2025-03-01", "state": "West Bengal", "district": "Birbhum", "pincode": "731204", "age_0_5": 0, "age_5_17": 0, "age_18_greater": 9.0}
            ]"#,
        ))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(records[0].total(), 7);
        assert_eq!(records[1].pincode, 731204);
        assert_eq!(records[1].age_18_greater, 9);
    }

    #[test]
    fn test_schema_error_lists_missing_columns() {
        let err = RecordValidator::validate(&table(
            r#"[{"date": "01-03-2025", "state": "WB", "district": "Birbhum", "age_0_5": 1}]"#,
        ))
        .unwrap_err();

        match err {
            AnalysisError::SchemaError { missing } => {
                assert_eq!(missing, vec!["pincode", "age_5_17", "age_18_greater"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_age_names_row() {
        let err = RecordValidator::validate(&table(
            r#"[
                {"date": "01-03-2025", "state": "WB", "district": "Birbhum", "pincode": 731101, "age_0_5": 1, "age_5_17": 1, "age_18_greater": 1},
                {"date": "02-03-2025", "state": "WB", "district": "Birbhum", "pincode": 731101, "age_0_5": 1, "age_5_17": -3, "age_18_greater": 1}
            ]"#,
        ))
        .unwrap_err();

        match err {
            AnalysisError::ValidationError { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "age_5_17");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_and_bad_date() {
        let issues = RecordValidator::validate_rows(&table(
            r#"[
                {"date": "31-02-2025", "state": "WB", "district": "Birbhum", "pincode": 731101, "age_0_5": 1, "age_5_17": 1, "age_18_greater": 1},
                {"date": "01-03-2025", "state": "WB", "district": "Birbhum", "pincode": 731101, "age_0_5": "many", "age_5_17": 1, "age_18_greater": 1},
                {"date": "01-03-2025", "state": "WB", "district": "Birbhum", "pincode": 731101, "age_0_5": 1, "age_5_17": 1, "age_18_greater": 1}
            ]"#,
        ))
        .unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].row, 1);
        assert_eq!(issues[0].column, "date");
        assert_eq!(issues[1].row, 2);
        assert_eq!(issues[1].column, "age_0_5");
    }

    #[test]
    fn test_overflowing_row_total_reported() {
        let max = i64::MAX;
        let issues = RecordValidator::validate_rows(&table(&format!(
            r#"[{{"date": "01-03-2025", "state": "WB", "district": "Birbhum", "pincode": 731101, "age_0_5": {max}, "age_5_17": {max}, "age_18_greater": {max}}}]"#
        )))
        .unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row, 1);
        assert_eq!(issues[0].column, "total");
    }

    #[test]
    fn test_zero_and_negative_pincode_rejected() {
        let issues = RecordValidator::validate_rows(&table(
            r#"[
                {"date": "01-03-2025", "state": "WB", "district": "Birbhum", "pincode": 0, "age_0_5": 1, "age_5_17": 1, "age_18_greater": 1},
                {"date": "01-03-2025", "state": "WB", "district": "Birbhum", "pincode": -731101, "age_0_5": 1, "age_5_17": 1, "age_18_greater": 1}
            ]"#,
        ))
        .unwrap();

        let columns: Vec<(usize, &str)> = issues.iter().map(|i| (i.row, i.column.as_str())).collect();
        assert_eq!(columns, vec![(1, "pincode"), (2, "pincode")]);
    }

    #[test]
    fn test_accepted_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9);
        assert_eq!(parse_date_str("09-03-2025"), expected);
        assert_eq!(parse_date_str("2025-03-09"), expected);
        assert_eq!(parse_date_str("09/03/2025"), expected);
        assert_eq!(parse_date_str("March 9"), None);
    }
}
