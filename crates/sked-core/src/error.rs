use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid frequency: '{0}'. Use one of daily, weekly, monthly, yearly")]
    InvalidFrequency(String),

    #[error("Invalid interval: {0}. The interval must be a positive integer")]
    InvalidInterval(i64),

    #[error("Invalid count: {0}. The count must not be negative")]
    InvalidCount(i64),

    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid modify type: '{0}'. Use one of only, after_all, all")]
    InvalidModifyType(String),

    #[error("Invalid color: '{0}'. Allowed colors are blue, green, yellow, purple, orange, mint, lavender, beige, coral")]
    InvalidColor(String),

    #[error("Invalid importance: '{0}'. Use one of very_low, low, medium, high, very_high")]
    InvalidImportance(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("Schedule {0} has no recurrence rule")]
    RuleNotFound(Uuid),

    #[error("Ambiguous schedule ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, title)

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage failure")]
    StorageFailure(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the caller sent something we refuse to act on. Nothing was
    /// written, and retrying the same request fails the same way.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidFrequency(_)
                | CoreError::InvalidInterval(_)
                | CoreError::InvalidCount(_)
                | CoreError::InvalidWindow { .. }
                | CoreError::InvalidModifyType(_)
                | CoreError::InvalidColor(_)
                | CoreError::InvalidImportance(_)
                | CoreError::InvalidInput(_)
                | CoreError::AmbiguousId(_)
        )
    }

    /// Message safe to show to an end user. Storage internals are replaced
    /// by a generic text.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::StorageFailure(_) | CoreError::Migration(_) | CoreError::Io(_) => {
                "An internal error occurred. Check the schedule before trying again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert!(CoreError::InvalidFrequency("hourly".into()).is_client_error());
        assert!(CoreError::InvalidColor("red".into()).is_client_error());
        assert!(CoreError::InvalidModifyType("some".into()).is_client_error());
        assert!(!CoreError::ScheduleNotFound("x".into()).is_client_error());
        assert!(!CoreError::StorageFailure(sqlx::Error::RowNotFound).is_client_error());
    }

    #[test]
    fn storage_failures_do_not_leak_detail() {
        let err = CoreError::StorageFailure(sqlx::Error::Protocol("disk I/O error at page 7".into()));
        let msg = err.user_message();
        assert!(!msg.contains("page 7"));
        assert!(msg.contains("internal error"));
        // A failed commit may or may not have landed.
        assert!(!msg.contains("Nothing was changed"));
        assert_eq!(
            CoreError::Io(std::io::Error::other("disk full")).user_message(),
            msg
        );

        let err = CoreError::InvalidColor("red".into());
        assert!(err.user_message().contains("red"));
    }
}
