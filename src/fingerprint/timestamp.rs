//! Timestamp parsing for first/last-seen values
//!
//! BuiltWith reports detection times as epoch milliseconds, while saved or
//! hand-written documents tend to use date strings. Both are accepted.

use super::types::Timestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Output format for parsed timestamps
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Values at or above this are treated as milliseconds rather than seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Builds a [`Timestamp`] from a JSON value. Empty strings, zero and null
/// yield `None`.
pub fn from_json(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => {
            let raw = s.trim();
            if raw.is_empty() {
                return None;
            }
            Some(Timestamp {
                raw: raw.to_string(),
                parsed: parse_str(raw),
            })
        }
        Value::Number(n) => {
            let epoch = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if epoch == 0 {
                return None;
            }
            Some(Timestamp {
                raw: n.to_string(),
                parsed: from_epoch(epoch),
            })
        }
        _ => None,
    }
}

/// Parses a timestamp string, trying each supported format in turn.
pub fn parse_str(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        return value.parse::<i64>().ok().and_then(from_epoch);
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Converts epoch seconds or milliseconds to a UTC datetime.
pub fn from_epoch(value: i64) -> Option<NaiveDateTime> {
    let dt = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    };
    dt.map(|dt| dt.naive_utc())
}

/// Formats a timestamp for the report, or an empty string when it could
/// not be parsed.
pub fn format(timestamp: Option<&Timestamp>) -> String {
    timestamp
        .and_then(|t| t.parsed)
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt(dt: Option<NaiveDateTime>) -> String {
        dt.map(|d| d.format(DISPLAY_FORMAT).to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_parse_string_formats() {
        assert_eq!(fmt(parse_str("2023-04-05 06:07:08")), "2023-04-05 06:07:08");
        assert_eq!(fmt(parse_str("2023-04-05T06:07:08")), "2023-04-05 06:07:08");
        assert_eq!(fmt(parse_str("2023-04-05T06:07:08Z")), "2023-04-05 06:07:08");
        assert_eq!(fmt(parse_str("2023-04-05")), "2023-04-05 00:00:00");
        assert_eq!(fmt(parse_str("04/05/2023")), "2023-04-05 00:00:00");
        // Not a valid month, so the day-first format applies
        assert_eq!(fmt(parse_str("25/12/2022")), "2022-12-25 00:00:00");
    }

    #[test]
    fn test_parse_epoch_seconds_and_millis() {
        assert_eq!(fmt(parse_str("1700000000")), "2023-11-14 22:13:20");
        assert_eq!(fmt(parse_str("1700000000000")), "2023-11-14 22:13:20");
        assert_eq!(fmt(from_epoch(1_700_000_000_000)), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_unparseable_keeps_raw() {
        let ts = from_json(&json!("last tuesday")).unwrap();
        assert_eq!(ts.raw, "last tuesday");
        assert!(ts.parsed.is_none());
        assert_eq!(format(Some(&ts)), "");
    }

    #[test]
    fn test_from_json_numbers() {
        let ts = from_json(&json!(1700000000000u64)).unwrap();
        assert_eq!(ts.raw, "1700000000000");
        assert_eq!(format(Some(&ts)), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_from_json_empty_values() {
        assert!(from_json(&json!("")).is_none());
        assert!(from_json(&json!("   ")).is_none());
        assert!(from_json(&json!(0)).is_none());
        assert!(from_json(&Value::Null).is_none());
        assert_eq!(format(None), "");
    }
}
