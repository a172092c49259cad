//! Timestamp decoding for request bodies.
//!
//! Clients send booking ranges either as RFC 3339 (`2025-03-01T10:00:00Z`) or
//! as a naive local timestamp (`2025-03-01T10:00:00`). Naive values are read
//! as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `#[serde(deserialize_with = "shareit_shared::time::lenient_utc")]`
pub fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lenient(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}
