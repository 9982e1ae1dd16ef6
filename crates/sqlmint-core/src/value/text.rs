use super::Value;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write as _;

/// Fixed lexical format for date/time values in audit payloads.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Fixed lexical format for date values in audit payloads.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Formats accepted when reading date/time text back from a driver.
const DATETIME_PARSE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

pub(super) fn to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Blob(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2);
            for b in bytes {
                let _ = write!(out, "{b:02x}");
            }
            out
        }
        Value::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        Value::Date(v) => v.format(DATE_FORMAT).to_string(),
        Value::DateTime(v) => v.format(DATETIME_FORMAT).to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Ulid(v) => v.to_string(),
    };

    Some(text)
}

/// Parse date/time text as produced by drivers that store timestamps as text.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    DATETIME_PARSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
