//! Display time zone handling. Storage and the engine stay in UTC; the zone
//! configured here only changes how instants are printed.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Detect system timezone
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && Tz::from_str(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if Tz::from_str(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

/// Parse the configured display zone, falling back to UTC for unknown names
pub fn display_timezone(name: &str) -> Tz {
    Tz::from_str(name).unwrap_or_else(|_| {
        tracing::warn!(timezone = name, "unknown display timezone, using UTC");
        Tz::UTC
    })
}

/// `2024-01-15 19:00 KST`
pub fn format_instant(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

/// Time part only, for the end of a slot that stays on the same local day.
pub fn format_span(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> String {
    let local_start = start.with_timezone(&tz);
    let local_end = end.with_timezone(&tz);
    if local_start.date_naive() == local_end.date_naive() {
        format!("{} - {}", format_instant(start, tz), local_end.format("%H:%M"))
    } else {
        format!("{} - {}", format_instant(start, tz), format_instant(end, tz))
    }
}
