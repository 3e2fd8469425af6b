//! Untyped tabular input
//!
//! A `RawTable` is what the ingestion layer hands over: named columns and rows
//! of loosely typed cells. Nothing downstream of the validator reads it.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Columns every enrolment table must carry
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "date",
    "state",
    "district",
    "pincode",
    "age_0_5",
    "age_5_17",
    "age_18_greater",
];

/// A single loosely typed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Integer(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl From<i64> for RawCell {
    fn from(v: i64) -> Self {
        RawCell::Integer(v)
    }
}

impl From<f64> for RawCell {
    fn from(v: f64) -> Self {
        RawCell::Number(v)
    }
}

impl From<&str> for RawCell {
    fn from(v: &str) -> Self {
        RawCell::Text(v.to_string())
    }
}

impl From<String> for RawCell {
    fn from(v: String) -> Self {
        RawCell::Text(v)
    }
}

impl From<serde_json::Value> for RawCell {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawCell::Null,
            serde_json::Value::Bool(b) => RawCell::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => RawCell::Integer(i),
                None => RawCell::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => RawCell::Text(s),
            other => RawCell::Text(other.to_string()),
        }
    }
}

impl RawCell {
    pub fn is_null(&self) -> bool {
        match self {
            RawCell::Null => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, if it carries a value
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            RawCell::Integer(i) => Some(i.to_string()),
            RawCell::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Integer value of the cell; integral floats and numeric text are accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawCell::Integer(i) => Some(*i),
            RawCell::Number(n) => integral(*n),
            RawCell::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        }
    }
}

fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Column-named rows of raw cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    /// Build a table; short rows are padded with nulls
    pub fn new(columns: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width.max(row.len()), RawCell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Parse a JSON array of row objects
    pub fn from_json_rows(json: &str) -> Result<Self, AnalysisError> {
        let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;
        Ok(Self::from_objects(objects))
    }

    /// Parse NDJSON (one row object per line)
    pub fn from_ndjson(ndjson: &str) -> Result<Self, AnalysisError> {
        let mut objects = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(trimmed) {
                Ok(object) => objects.push(object),
                Err(e) => {
                    return Err(AnalysisError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(Self::from_objects(objects))
    }

    /// Columns are the union of object keys, in first-seen order
    fn from_objects(objects: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for object in &objects {
            for key in object.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .into_iter()
            .map(|object| {
                let mut row = vec![RawCell::Null; columns.len()];
                for (key, value) in object {
                    if let Some(&i) = index.get(&key) {
                        row[i] = RawCell::from(value);
                    }
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched after trimming and lowercasing
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name))
    }

    /// Required columns absent from this table
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_rows_unions_columns() {
        let table = RawTable::from_json_rows(
            r#"[{"date": "01-03-2025", "pincode": 731101}, {"date": "02-03-2025", "state": "WB"}]"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().len(), 3);
        let state = table.column_index("state").unwrap();
        assert!(table.rows()[0][state].is_null());
    }

    #[test]
    fn test_ndjson_reports_line() {
        let err = RawTable::from_ndjson("{\"date\": \"x\"}\n\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_cell_integer_coercion() {
        assert_eq!(RawCell::from("12").as_i64(), Some(12));
        assert_eq!(RawCell::from(" 7.0 ").as_i64(), Some(7));
        assert_eq!(RawCell::from(3.5).as_i64(), None);
        assert_eq!(RawCell::from("abc").as_i64(), None);
        assert_eq!(RawCell::Null.as_i64(), None);
    }

    #[test]
    fn test_missing_columns() {
        let table = RawTable::new(
            vec!["date".to_string(), "State".to_string(), "pincode".to_string()],
            vec![],
        );
        assert_eq!(
            table.missing_columns(),
            vec!["district", "age_0_5", "age_5_17", "age_18_greater"]
        );
    }
}
