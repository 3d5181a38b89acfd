//! Timestamp normalization
//!
//! Content documents carry `publishedAt` in whatever shape the writer used:
//! an RFC 3339 string (also what Firestore's `timestampValue` decodes to), a
//! bare `YYYY-MM-DD` date, a serialized SDK timestamp wrapper
//! (`{seconds, nanoseconds}` or the admin SDK's `{_seconds, _nanoseconds}`),
//! or epoch milliseconds. Everything leaves the repository as
//! `DateTime<Utc>`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Normalize a stored timestamp value, `None` if it is not a timestamp
pub fn normalize(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str(s),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .or_else(|| map.get("nanos"))
                .and_then(as_i64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).ok()?;
            Utc.timestamp_opt(seconds, nanos).single()
        }
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// Protobuf-style JSON encodes int64 seconds as strings
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Serde adapter for optional timestamp fields of any supported shape
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    normalize(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {}", value)))
}
