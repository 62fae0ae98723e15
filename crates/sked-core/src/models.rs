use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// The nine colors a schedule can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Mint,
    Lavender,
    Beige,
    Coral,
}

impl Color {
    pub const ALL: [Color; 9] = [
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Purple,
        Color::Orange,
        Color::Mint,
        Color::Lavender,
        Color::Beige,
        Color::Coral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Purple => "purple",
            Color::Orange => "orange",
            Color::Mint => "mint",
            Color::Lavender => "lavender",
            Color::Beige => "beige",
            Color::Coral => "coral",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Color::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| CoreError::InvalidColor(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Importance::VeryLow => write!(f, "very_low"),
            Importance::Low => write!(f, "low"),
            Importance::Medium => write!(f, "medium"),
            Importance::High => write!(f, "high"),
            Importance::VeryHigh => write!(f, "very_high"),
        }
    }
}

impl FromStr for Importance {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "very_low" => Ok(Importance::VeryLow),
            "low" => Ok(Importance::Low),
            "medium" => Ok(Importance::Medium),
            "high" => Ok(Importance::High),
            "very_high" => Ok(Importance::VeryHigh),
            _ => Err(CoreError::InvalidImportance(s.to_string())),
        }
    }
}

/// How far the cursor moves per cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(CoreError::InvalidFrequency(s.to_string())),
        }
    }
}

/// Which part of a recurring series an edit applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModifyType {
    /// Detach a single occurrence from the series
    Only,
    /// Split the series at the edited start; the edit applies from there on
    AfterAll,
    /// Rewrite the series in place, past occurrences included
    All,
}

impl std::fmt::Display for ModifyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModifyType::Only => write!(f, "only"),
            ModifyType::AfterAll => write!(f, "after_all"),
            ModifyType::All => write!(f, "all"),
        }
    }
}

impl FromStr for ModifyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "only" => Ok(ModifyType::Only),
            "after_all" => Ok(ModifyType::AfterAll),
            "all" => Ok(ModifyType::All),
            _ => Err(CoreError::InvalidModifyType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub note: Option<String>,
    pub color: Color,
    pub importance: Importance,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Length of one occurrence.
    pub fn duration(&self) -> Duration {
        self.end_date - self.start_date
    }
}

/// Repeating pattern attached 1:1 to a schedule. The series anchor is the
/// owning schedule's `start_date`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RecurrenceRule {
    pub id: Uuid,
    pub schedule_id: Uuid,
    /// Stored text; validated when the rule is compiled for expansion
    pub frequency: String,
    /// Absent means 1
    pub interval: Option<i64>,
    /// Inclusive bound on occurrence starts
    pub until: Option<DateTime<Utc>>,
    /// Inclusive cap on generated cycles
    pub count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A suppressed occurrence slot of a rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RecurrenceException {
    pub id: Uuid,
    pub rule_id: Uuid,
    /// Start of the original occurrence being suppressed
    pub start_date: DateTime<Utc>,
    /// End of the original occurrence being suppressed
    pub end_date: DateTime<Utc>,
    /// Detached schedule created by a single-occurrence edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_schedule_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Reminder {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub minutes_before: i64,
}

/// One concrete realisation of a schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct OccurrenceSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OccurrenceSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

// ============================================================================
// Data Transfer Objects
// ============================================================================

/// Recurrence parameters as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatSpec {
    pub frequency: Frequency,
    pub interval: Option<i64>,
    pub until: Option<DateTime<Utc>>,
    pub count: Option<i64>,
}

impl RepeatSpec {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: None,
            until: None,
            count: None,
        }
    }
}

/// Payload for creating a schedule, optionally recurring.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchedule {
    pub title: String,
    pub note: Option<String>,
    pub color: Color,
    pub importance: Importance,
    pub tags: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub repeat: Option<RepeatSpec>,
    /// Minutes before the event
    pub reminders: Vec<i64>,
}

impl NewSchedule {
    pub fn new(title: impl Into<String>, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            note: None,
            color: Color::Blue,
            importance: Importance::Medium,
            tags: Vec::new(),
            start_date,
            end_date,
            repeat: None,
            reminders: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Title must not be empty".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(CoreError::InvalidInput(format!(
                "Start {} is after end {}",
                self.start_date, self.end_date
            )));
        }
        if self.reminders.iter().any(|m| *m < 0) {
            return Err(CoreError::InvalidInput(
                "Reminder offsets must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload for modifying an existing schedule. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default)]
pub struct EditedFields {
    pub title: Option<String>,
    pub note: Option<String>,
    pub color: Option<Color>,
    pub importance: Option<Importance>,
    pub tags: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub repeat: Option<RepeatSpec>,
    pub reminders: Option<Vec<i64>>,
    /// For single-occurrence edits: the original slot being detached.
    /// Defaults to the edited start/end.
    pub occurrence: Option<OccurrenceSlot>,
}

/// Result of a successful modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModifyOutcome {
    /// One occurrence was suppressed and re-created as its own schedule
    Detached { schedule_id: Uuid, exception_id: Uuid },
    /// An identical single-occurrence edit already exists; nothing was written
    AlreadyApplied { schedule_id: Uuid, exception_id: Uuid },
    /// The series was split; `schedule_id` continues it from the cut point
    Forked { original_id: Uuid, schedule_id: Uuid },
    /// The series was rewritten in place
    Updated { schedule_id: Uuid },
}

impl ModifyOutcome {
    /// The schedule the caller should look at next.
    pub fn schedule_id(&self) -> Uuid {
        match self {
            ModifyOutcome::Detached { schedule_id, .. }
            | ModifyOutcome::AlreadyApplied { schedule_id, .. }
            | ModifyOutcome::Forked { schedule_id, .. }
            | ModifyOutcome::Updated { schedule_id } => *schedule_id,
        }
    }

    pub fn wrote_anything(&self) -> bool {
        !matches!(self, ModifyOutcome::AlreadyApplied { .. })
    }
}

/// A schedule with its concrete occurrences inside a query window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScheduleOccurrences {
    pub id: Uuid,
    pub title: String,
    pub color: Color,
    pub dates: Vec<OccurrenceSlot>,
}

/// Everything attached to one schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDetail {
    pub schedule: Schedule,
    pub rule: Option<RecurrenceRule>,
    pub exceptions: Vec<RecurrenceException>,
    pub tags: Vec<Tag>,
    pub reminders: Vec<Reminder>,
    /// First non-suppressed occurrence of the series (or the schedule itself)
    pub first_occurrence: Option<OccurrenceSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn exactly_nine_colors_parse() {
        for color in Color::ALL {
            assert_eq!(color.as_str().parse::<Color>().unwrap(), color);
        }
        assert_eq!("Coral".parse::<Color>().unwrap(), Color::Coral);
        assert_eq!(Color::ALL.len(), 9);
    }

    #[rstest]
    #[case("red")]
    #[case("")]
    #[case("blue-ish")]
    fn unknown_colors_are_rejected(#[case] input: &str) {
        assert!(matches!(input.parse::<Color>(), Err(CoreError::InvalidColor(_))));
    }

    #[rstest]
    #[case("only", ModifyType::Only)]
    #[case("after_all", ModifyType::AfterAll)]
    #[case("ALL", ModifyType::All)]
    fn modify_types_parse(#[case] input: &str, #[case] expected: ModifyType) {
        assert_eq!(input.parse::<ModifyType>().unwrap(), expected);
        assert_eq!(expected.to_string().parse::<ModifyType>().unwrap(), expected);
    }

    #[test]
    fn unknown_modify_type_is_rejected() {
        assert!(matches!(
            "this_and_future".parse::<ModifyType>(),
            Err(CoreError::InvalidModifyType(_))
        ));
    }

    #[test]
    fn frequency_and_importance_round_trip_display() {
        for f in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly, Frequency::Yearly] {
            assert_eq!(f.to_string().parse::<Frequency>().unwrap(), f);
        }
        assert!(matches!("hourly".parse::<Frequency>(), Err(CoreError::InvalidFrequency(_))));
        assert_eq!("very_high".parse::<Importance>().unwrap(), Importance::VeryHigh);
        assert!(matches!("urgent".parse::<Importance>(), Err(CoreError::InvalidImportance(_))));
    }

    #[test]
    fn new_schedule_validation() {
        let now = Utc::now();
        assert!(NewSchedule::new("ok", now, now).validate().is_ok());
        assert!(NewSchedule::new("  ", now, now).validate().is_err());
        assert!(NewSchedule::new("backwards", now, now - Duration::hours(1)).validate().is_err());

        let mut negative = NewSchedule::new("reminder", now, now);
        negative.reminders = vec![-5];
        assert!(negative.validate().is_err());
    }
}
