//! Loading raw epoch records from their storage representation.

pub mod observation;
pub mod solution;
pub mod tracking;

use std::{fs, path::Path};

use hifitime::Epoch;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Load one epoch record file into its key/value map.
pub(crate) fn load_record(path: &Path) -> Result<Map<String, Value>> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::NotARecord {
            path: path.to_path_buf(),
        }),
    }
}

/// Per-measurement field names are templated on the 1-based measurement
/// index: indices below ten are zero-padded (`svId_07`), ten and above are
/// not (`svId_12`).
pub(crate) fn indexed_key(base: &str, index: usize) -> String {
    if index < 10 {
        format!("{base}_0{index}")
    } else {
        format!("{base}_{index}")
    }
}

/// Numeric field access. Booleans coerce the way they would through a float
/// matrix (true = 1.0), which some flag fields rely on.
fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_bool().map(|b| if b { 1.0 } else { 0.0 }))
}

pub(crate) fn optional_f64(record: &Map<String, Value>, key: &str) -> Option<f64> {
    record.get(key).and_then(value_as_f64)
}

pub(crate) fn required_f64(record: &Map<String, Value>, path: &Path, key: &str) -> Result<f64> {
    optional_f64(record, key).ok_or_else(|| Error::MissingField {
        path: path.to_path_buf(),
        field: key.to_string(),
    })
}

pub(crate) fn required_count(record: &Map<String, Value>, path: &Path, key: &str) -> Result<usize> {
    record
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| Error::MissingField {
            path: path.to_path_buf(),
            field: key.to_string(),
        })
}

pub(crate) fn required_str(
    record: &Map<String, Value>,
    path: &Path,
    key: &str,
) -> Result<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField {
            path: path.to_path_buf(),
            field: key.to_string(),
        })
}

/// Parse a record stamp such as `2023-09-12 14-00-01`. Time separators may
/// be `-` or `:` depending on which tool produced the file.
pub(crate) fn parse_stamp(stamp: &str) -> Option<Epoch> {
    let (date, time) = stamp.trim().split_once(' ')?;
    let mut date_parts = date.split('-');
    let year: i32 = date_parts.next()?.parse().ok()?;
    let month: u8 = date_parts.next()?.parse().ok()?;
    let day: u8 = date_parts.next()?.parse().ok()?;
    let mut time_parts = time.split(|c| c == '-' || c == ':');
    let hour: u8 = time_parts.next()?.parse().ok()?;
    let minute: u8 = time_parts.next()?.parse().ok()?;
    let second: u8 = time_parts.next()?.parse().ok()?;
    Some(Epoch::from_gregorian_utc(
        year, month, day, hour, minute, second, 0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_keys_switch_template_at_ten() {
        assert_eq!(indexed_key("svId", 1), "svId_01");
        assert_eq!(indexed_key("svId", 9), "svId_09");
        assert_eq!(indexed_key("svId", 10), "svId_10");
        assert_eq!(indexed_key("gnssId", 42), "gnssId_42");
    }

    #[test]
    fn stamps_parse_with_either_time_separator() {
        let a = parse_stamp("2023-09-12 14-00-01").unwrap();
        let b = parse_stamp("2023-09-12 14:00:01").unwrap();
        assert_eq!(a, b);
        assert!(parse_stamp("2023-09-12 14-00-30").unwrap() > a);
        assert_eq!(parse_stamp("not a stamp"), None);
    }

    #[test]
    fn booleans_coerce_to_floats() {
        assert_eq!(value_as_f64(&Value::Bool(true)), Some(1.0));
        assert_eq!(value_as_f64(&Value::Bool(false)), Some(0.0));
        assert_eq!(value_as_f64(&Value::from(7)), Some(7.0));
        assert_eq!(value_as_f64(&Value::String("7".into())), None);
    }
}
