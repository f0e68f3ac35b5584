//! Timestamp and calendar-day utilities
//!
//! Production records are keyed by calendar day. Callers may send a bare
//! `YYYY-MM-DD` or a full timestamp; both normalize to the day it names.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 form used for stored timestamps
///
/// Fixed width keeps lexical and chronological order identical in TEXT
/// columns.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `format_timestamp(now())`
pub fn now_string() -> String {
    format_timestamp(now())
}

/// Current calendar day (UTC)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse a request date into a calendar day
///
/// Accepts `2024-05-01`, `2024-05-01T08:30:00` and RFC 3339 timestamps.
/// Timestamps carrying an offset keep the day as written in that offset.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("date is required".to_string()));
    }

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts.date());
    }

    Err(Error::InvalidInput(format!("Invalid date: '{}'", trimmed)))
}

/// Parse an inclusive date range, rejecting ranges that run backwards
pub fn parse_day_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start = parse_day(start)?;
    let end = parse_day(end)?;
    if end < start {
        return Err(Error::InvalidInput(format!(
            "endDate {} is before startDate {}",
            end, start
        )));
    }
    Ok((start, end))
}

/// Parse a `YYYY-MM-DD` day read back from a database column
pub fn parse_stored_day(column: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Corrupt {} '{}': {}", column, value, e)))
}

/// Parse an RFC 3339 timestamp read back from a database column
pub fn parse_stored_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt {} '{}': {}", column, value, e)))
}
