//! Lenient field decoders for the AppHub wire format.
//!
//! The backend is loosely typed: identifiers arrive as strings or numbers,
//! counters sometimes arrive as numeric strings, and dates come either as
//! RFC 3339 timestamps or bare `YYYY-MM-DD` values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Accept `"42"`, `42`, or `null` (empty string)
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn number_from_value<E: de::Error>(value: Value) -> Result<Option<f64>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| E::custom(format!("invalid numeric string: {:?}", s))),
        other => Err(E::custom(format!("expected number, got {}", other))),
    }
}

/// Accept a number or numeric string; `null` becomes `0.0`
pub fn f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from_value(Value::deserialize(deserializer)?)?.unwrap_or(0.0))
}

/// Optional variant of [`f64_lenient`]
pub fn opt_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    number_from_value(Value::deserialize(deserializer)?)
}

/// Accept a non-negative integer or numeric string; `null` becomes `0`
pub fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = number_from_value(Value::deserialize(deserializer)?)?.unwrap_or(0.0);
    if value < 0.0 || !value.is_finite() {
        return Err(de::Error::custom(format!("expected non-negative count, got {}", value)));
    }
    Ok(value as u64)
}

/// Accept `"react, rust"` or `["react", "rust"]`
pub fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(split_list(&s)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(de::Error::custom(format!("expected string tag, got {}", other))),
            })
            .collect(),
        other => Err(de::Error::custom(format!("expected tag list, got {}", other))),
    }
}

/// Split a comma-separated tag string, dropping blanks
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a backend timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD`
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Optional timestamp in any of the formats [`parse_timestamp`] accepts
pub fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {:?}", s))),
        Value::Number(n) => Ok(n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)),
        other => Err(de::Error::custom(format!("expected timestamp, got {}", other))),
    }
}
