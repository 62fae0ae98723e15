use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    EditedFields, ModifyOutcome, ModifyType, NewSchedule, OccurrenceSlot, RecurrenceException,
    Schedule, ScheduleDetail, ScheduleOccurrences, Tag,
};
use crate::recurrence::QueryWindow;
use async_trait::async_trait;
use uuid::Uuid;

pub mod exceptions;
pub mod modifications;
pub mod occurrences;
pub mod schedules;
pub mod tags;

/// Domain-specific trait for schedule records
#[async_trait]
pub trait ScheduleRepository {
    /// Stores a schedule together with its tags, rule and reminders.
    async fn create_schedule(&self, owner_id: &str, data: NewSchedule) -> Result<Schedule, CoreError>;
    async fn find_schedule(&self, owner_id: &str, id: Uuid) -> Result<Option<Schedule>, CoreError>;
    async fn find_schedules_by_short_id_prefix(&self, owner_id: &str, short_id: &str) -> Result<Vec<Schedule>, CoreError>;
    async fn find_schedule_detail(&self, owner_id: &str, id: Uuid) -> Result<ScheduleDetail, CoreError>;
    async fn delete_schedule(&self, owner_id: &str, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for expanding stored schedules
#[async_trait]
pub trait OccurrenceRepository {
    /// Occurrences of every schedule of `owner_id` inside `window`. With
    /// `tag_titles` non-empty, only schedules carrying one of them.
    async fn list_occurrences(
        &self,
        owner_id: &str,
        window: QueryWindow,
        tag_titles: &[String],
    ) -> Result<Vec<ScheduleOccurrences>, CoreError>;
}

/// Domain-specific trait for exception operations
#[async_trait]
pub trait ExceptionRepository {
    async fn find_exceptions(&self, rule_id: Uuid) -> Result<Vec<RecurrenceException>, CoreError>;
    /// Suppresses `slot`. Adding the same slot twice leaves one row; the flag
    /// tells whether this call inserted it.
    async fn add_exception(&self, rule_id: Uuid, slot: OccurrenceSlot) -> Result<(RecurrenceException, bool), CoreError>;
}

/// Domain-specific trait for editing recurring schedules
#[async_trait]
pub trait ModificationRepository {
    async fn modify_schedule(
        &self,
        owner_id: &str,
        schedule_id: Uuid,
        modify_type: ModifyType,
        edited: EditedFields,
    ) -> Result<ModifyOutcome, CoreError>;
}

/// Domain-specific trait for tag operations
#[async_trait]
pub trait TagRepository {
    async fn find_tags(&self, owner_id: &str) -> Result<Vec<Tag>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository:
    ScheduleRepository
    + OccurrenceRepository
    + ExceptionRepository
    + ModificationRepository
    + TagRepository
{
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}

/// Every operation acts on behalf of an identified owner.
pub(crate) fn require_owner(owner_id: &str) -> Result<(), CoreError> {
    if owner_id.trim().is_empty() {
        return Err(CoreError::Unauthorized);
    }
    Ok(())
}
