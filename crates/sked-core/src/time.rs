//! UTC normalization for every instant that enters the engine.
//!
//! Rule anchors, `until` bounds, exception slots, query bounds and edited
//! fields are all compared against each other, so they must share one
//! representation. Values without offset information are taken to already be
//! UTC wall-clock time; they are never reinterpreted in the local zone.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};

use crate::error::CoreError;

/// Conversion of any instant representation into an absolute UTC instant.
pub trait ToUtc {
    fn to_utc(&self) -> DateTime<Utc>;
}

impl ToUtc for DateTime<Utc> {
    #[inline]
    fn to_utc(&self) -> DateTime<Utc> {
        *self
    }
}

impl ToUtc for DateTime<FixedOffset> {
    #[inline]
    fn to_utc(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

impl ToUtc for DateTime<Local> {
    #[inline]
    fn to_utc(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

/// Naive values are tagged as UTC as-is.
impl ToUtc for NaiveDateTime {
    #[inline]
    fn to_utc(&self) -> DateTime<Utc> {
        self.and_utc()
    }
}

/// A bare date means midnight UTC of that day.
impl ToUtc for NaiveDate {
    #[inline]
    fn to_utc(&self) -> DateTime<Utc> {
        self.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO 8601 instant.
///
/// Accepts RFC 3339 with `Z` or an explicit offset, naive date-times (with a
/// `T` or a space separator, seconds optional) and bare dates. Naive input is
/// UTC.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, CoreError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.to_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.to_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.to_utc());
    }

    Err(CoreError::InvalidInput(format!(
        "Invalid date format '{}'. Use ISO 8601, e.g. '2024-05-10T10:00:00Z'",
        input
    )))
}
