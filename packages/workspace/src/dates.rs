//! Date parsing for perimeter attribute values.
//!
//! Perimeter datasets exported from different tools disagree on how dates
//! look: ISO dates, ISO date-times, Esri-style `YYYY/MM/DD HH:MM:SS+00`
//! strings, or epoch milliseconds. Everything is normalized to a naive UTC
//! date-time.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a date property value. Returns `None` for null or unparseable
/// values.
#[must_use]
pub fn parse_date_value(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => {
            #[allow(clippy::cast_possible_truncation)]
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
        }
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

/// Parses a date string in any of the supported layouts.
#[must_use]
pub fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S%#z") {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Converts a stored epoch-seconds value back into a date-time.
#[must_use]
pub fn from_epoch_seconds(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

/// Converts a date-time into epoch seconds for storage.
#[must_use]
pub fn to_epoch_seconds(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}
