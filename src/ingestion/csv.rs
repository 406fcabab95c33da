//! CSV parsing into the row engine's [`DataSet`].

use std::collections::HashSet;

use crate::error::{StatsError, StatsResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Parse decoded CSV text (header row first) into a [`DataSet`].
///
/// Rules:
///
/// - The first record is the header; names must be non-empty as a whole and unique.
/// - Every column is [`DataType::Utf8`]; cells are trimmed and blank cells become [`Value::Null`].
/// - Rows in which every cell is blank are dropped.
/// - Records with a different field count than the header are a structural error.
pub fn dataset_from_csv_str(text: &str) -> StatsResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    dataset_from_reader(&mut rdr)
}

/// Parse CSV data from an existing CSV reader.
pub fn dataset_from_reader<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> StatsResult<DataSet> {
    let headers = rdr.headers()?.clone();
    check_headers(&headers)?;
    let schema = Schema::new(
        headers
            .iter()
            .map(|name| Field::new(name, DataType::Utf8))
            .collect(),
    );

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<Value> = record.iter().map(parse_cell).collect();
        if row.iter().all(|v| matches!(v, Value::Null)) {
            continue;
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema, rows))
}

/// Validates the shape of `text` without building a table and returns its header names.
///
/// Applies the same header rules as [`dataset_from_reader`] and rejects any record whose field
/// count differs from the header's.
pub fn checked_header_names(text: &str) -> StatsResult<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();
    check_headers(&headers)?;
    let mut record = csv::StringRecord::new();
    while rdr.read_record(&mut record)? {}
    Ok(headers.iter().map(str::to_owned).collect())
}

/// A header row must exist and name every column once.
pub fn check_headers(headers: &csv::StringRecord) -> StatsResult<()> {
    if headers.is_empty() {
        return Err(StatsError::SchemaMismatch {
            message: "csv has no header row".to_string(),
        });
    }
    let mut seen = HashSet::with_capacity(headers.len());
    for name in headers.iter() {
        if !seen.insert(name) {
            return Err(StatsError::SchemaMismatch {
                message: format!(
                    "duplicate column '{name}'. headers={:?}",
                    headers.iter().collect::<Vec<_>>()
                ),
            });
        }
    }
    Ok(())
}

fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Utf8(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{checked_header_names, dataset_from_csv_str};
    use crate::types::Value;

    #[test]
    fn header_defines_schema_and_cells_are_text() {
        let ds = dataset_from_csv_str("a,b\n1,x\n 2 , y \n").unwrap();
        assert_eq!(ds.schema.field_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows[1], vec![Value::Utf8("2".to_string()), Value::Utf8("y".to_string())]);
    }

    #[test]
    fn blank_cells_are_null_and_blank_rows_dropped() {
        let ds = dataset_from_csv_str("a,b\n1,\n,\n  ,  \n,z\n").unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows[0][1], Value::Null);
        assert_eq!(ds.rows[1][0], Value::Null);
    }

    #[test]
    fn quoted_nested_cells_survive() {
        let ds = dataset_from_csv_str("id,meta\n1,\"{'A': {'x': 1}, 'B': {'x': 2}}\"\n").unwrap();
        assert_eq!(ds.rows[0][1], Value::Utf8("{'A': {'x': 1}, 'B': {'x': 2}}".to_string()));
    }

    #[test]
    fn ragged_rows_are_errors() {
        let err = dataset_from_csv_str("a,b\n1,2,3\n").unwrap_err();
        assert!(err.to_string().contains("csv error"));
    }

    #[test]
    fn shape_check_rejects_short_and_long_records() {
        assert_eq!(checked_header_names("a,b\n1,x\n,\n").unwrap(), vec!["a", "b"]);
        assert!(checked_header_names("a,b\n1\n2,y\n").is_err());
        assert!(checked_header_names("a,b\n1,2,3\n").is_err());
    }

    #[test]
    fn duplicate_headers_are_errors() {
        let err = dataset_from_csv_str("a,a\n1,2\n").unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
        assert!(checked_header_names("x,y,x\n").is_err());
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = dataset_from_csv_str("").unwrap_err();
        assert!(err.to_string().contains("no header row"));
        assert_eq!(checked_header_names("a,b\n").unwrap(), vec!["a", "b"]);
    }
}
