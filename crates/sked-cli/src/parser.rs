use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use sked_core::error::CoreError;
use sked_core::models::{Frequency, RepeatSpec};
use sked_core::time::parse_instant;

use crate::cli::RepeatArgs;

/// ISO 8601 first, then natural language ("tomorrow 10am") relative to now.
/// Natural language is read in UTC.
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>> {
    match parse_instant(input) {
        Ok(instant) => Ok(instant),
        Err(iso_error) => parse_date_string(input, Utc::now(), Dialect::Us).map_err(|e| {
            tracing::debug!(input, error = %e, "natural language parse failed");
            anyhow::Error::new(iso_error)
        }),
    }
}

pub fn parse_repeat(args: &RepeatArgs) -> Result<Option<RepeatSpec>> {
    let Some(every) = &args.every else {
        return Ok(None);
    };

    let frequency: Frequency = every.parse()?;
    Ok(Some(RepeatSpec {
        frequency,
        interval: args.interval,
        until: args.until.as_deref().map(parse_datetime).transpose()?,
        count: args.count,
    }))
}

/// Parse an enum-like flag through its `FromStr`, keeping the core error.
pub fn parse_flag<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = CoreError>,
{
    Ok(value.map(str::parse).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use sked_core::models::Color;

    #[rstest]
    #[case("2024-05-10T10:00:00Z")]
    #[case("2024-05-10 10:00")]
    #[case("2024-05-10")]
    fn iso_input_is_exact(#[case] input: &str) {
        let parsed = parse_datetime(input).unwrap();
        assert_eq!(parsed.date_naive(), Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap().date_naive());
    }

    #[test]
    fn natural_language_is_accepted() {
        let parsed = parse_datetime("tomorrow").unwrap();
        assert!(parsed > Utc::now());
    }

    #[test]
    fn garbage_reports_the_iso_hint() {
        let err = parse_datetime("banana").unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert!(matches!(core, CoreError::InvalidInput(msg) if msg.contains("ISO 8601")));
    }

    #[test]
    fn repeat_needs_a_known_frequency() {
        let args = RepeatArgs {
            every: Some("fortnightly".to_string()),
            ..Default::default()
        };
        let err = parse_repeat(&args).unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::InvalidFrequency(_))));

        assert!(parse_repeat(&RepeatArgs::default()).unwrap().is_none());
    }

    #[test]
    fn flags_keep_core_errors() {
        assert_eq!(parse_flag::<Color>(Some("coral")).unwrap(), Some(Color::Coral));
        assert_eq!(parse_flag::<Color>(None).unwrap(), None);
        let err = parse_flag::<Color>(Some("red")).unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::InvalidColor(_))));
    }
}
