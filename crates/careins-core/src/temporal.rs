//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the instant type used for every caregiving start,
//! end, stop, and cancellation time. Always UTC, truncated to seconds.
//!
//! Two timestamps that describe the same wall-clock second compare equal,
//! which is what the no-op checks in the round aggregate rely on ("editing"
//! a start time to the value it already has must not raise a modification).
//!
//! ## Parsing
//!
//! [`Timestamp::parse()`] accepts RFC 3339 with a `Z` suffix only. Operator
//! input that carries an offset goes through [`Timestamp::parse_lenient()`],
//! which converts to UTC.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CareinsError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// Deserialization truncates too, so stored values with sub-second
/// precision load as the same second they describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Build a timestamp from calendar fields (UTC).
    ///
    /// # Errors
    ///
    /// Returns `CareinsError::Validation` if the fields do not name a valid instant.
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self, CareinsError> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .map(Self)
            .ok_or_else(|| {
                CareinsError::Validation(format!(
                    "invalid calendar instant {year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"
                ))
            })
    }

    /// Parse a timestamp from an RFC 3339 string with a `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid RFC 3339 or uses a
    /// non-`Z` offset (even `+00:00`).
    pub fn parse(s: &str) -> Result<Self, CareinsError> {
        if !s.ends_with('Z') {
            return Err(CareinsError::Validation(format!(
                "Timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset and
    /// converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CareinsError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            CareinsError::Validation(format!("Invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
