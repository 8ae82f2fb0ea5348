//! Timestamp codec
//!
//! Converts between the external ISO-8601 representation, the internal
//! `DateTime<Utc>` instant and the canonical store format:
//!
//! ```text
//! 2024-03-09 14:05:07.042
//! ```
//!
//! The store format is fixed-width and zero-padded, so comparing two encoded
//! values as strings gives the same answer as comparing the instants. Range
//! predicates in the query builder depend on that property.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use thiserror::Error;

/// Canonical format written to and read from the store
pub const STORE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Store format without the fractional part (older rows, manual inserts)
const STORE_FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp parse failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timestamp '{input}': expected ISO-8601 or 'YYYY-MM-DD HH:MM:SS.mmm'")]
pub struct TimestampError {
    pub input: String,
}

/// Encode an instant in the canonical store format (UTC, millisecond precision)
pub fn encode(instant: &DateTime<Utc>) -> String {
    truncate_millis(instant).format(STORE_FORMAT).to_string()
}

/// Decode a store-format or ISO-8601 timestamp.
///
/// ISO-8601 values without an offset, and bare dates, are read as UTC. A bare
/// date is midnight.
pub fn decode(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = input.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, STORE_FORMAT) {
        return Ok(naive.and_utc());
    }

    // %.3f requires exactly three digits; %.f accepts any precision
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(truncate_millis(&naive.and_utc()));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, STORE_FORMAT_SECONDS) {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(truncate_millis(&dt.with_timezone(&Utc)));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(truncate_millis(&naive.and_utc()));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError {
            input: input.to_string(),
        })
}

/// Render an instant as an external ISO-8601 string (`2024-01-01T00:00:00.000Z`)
pub fn to_iso8601(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drop sub-millisecond precision
pub fn truncate_millis(instant: &DateTime<Utc>) -> DateTime<Utc> {
    let nanos = instant.nanosecond();
    instant
        .with_nanosecond(nanos - nanos % 1_000_000)
        .unwrap_or(*instant)
}
