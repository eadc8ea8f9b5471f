//! Timestamp parsing/formatting for upstream play times.

#![forbid(unsafe_code)]

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an upstream timestamp. RFC 3339 first, then zone-less forms read as
/// local wall-clock time. A local time skipped by a DST jump lands one hour later.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .and_then(|n| from_local(&n))
}

fn from_local(n: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(n)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(*n + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Milliseconds since epoch used as the sort key; unparsable values sort as 0.
pub fn sort_millis(s: &str) -> i64 {
    parse_timestamp(s).map(|dt| dt.timestamp_millis()).unwrap_or(0)
}

/// Local-time rendering; unparsable input is shown verbatim, empty stays empty.
pub fn format_local(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    match parse_timestamp(s) {
        Some(dt) => format_instant(&dt),
        None => s.to_string(),
    }
}

pub fn format_instant(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn unix_millis() -> i64 { Utc::now().timestamp_millis() }
