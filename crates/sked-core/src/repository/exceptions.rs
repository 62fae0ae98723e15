use crate::error::CoreError;
use crate::models::{OccurrenceSlot, RecurrenceException, RecurrenceRule};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ExceptionRepository for SqliteRepository {
    async fn find_exceptions(&self, rule_id: Uuid) -> Result<Vec<RecurrenceException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM recurrence_exceptions WHERE rule_id = $1 ORDER BY start_date",
        )
        .bind(rule_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    #[tracing::instrument(skip(self))]
    async fn add_exception(&self, rule_id: Uuid, slot: OccurrenceSlot) -> Result<(RecurrenceException, bool), CoreError> {
        let mut tx = self.pool().begin().await?;

        let rule: Option<RecurrenceRule> = sqlx::query_as("SELECT * FROM recurrence_rules WHERE id = $1")
            .bind(rule_id)
            .fetch_optional(&mut *tx)
            .await?;
        if rule.is_none() {
            return Err(CoreError::RuleNotFound(rule_id));
        }

        if let Some(created) = Self::insert_exception_in_transaction(&mut tx, rule_id, slot, None).await? {
            tx.commit().await?;
            return Ok((created, true));
        }

        let existing = Self::find_exception_in_transaction(&mut tx, rule_id, slot)
            .await?
            .ok_or(CoreError::StorageFailure(sqlx::Error::RowNotFound))?;
        tx.rollback().await?;
        Ok((existing, false))
    }
}

impl SqliteRepository {
    /// Insert an exception unless its slot is already suppressed. `None` means
    /// the unique key was taken and nothing was written.
    pub(crate) async fn insert_exception_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        rule_id: Uuid,
        slot: OccurrenceSlot,
        override_schedule_id: Option<Uuid>,
    ) -> Result<Option<RecurrenceException>, CoreError> {
        let exception = RecurrenceException {
            id: Uuid::now_v7(),
            rule_id,
            start_date: slot.start,
            end_date: slot.end,
            override_schedule_id,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"INSERT INTO recurrence_exceptions (id, rule_id, start_date, end_date, override_schedule_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (start_date, end_date, rule_id) DO NOTHING"#,
        )
        .bind(exception.id)
        .bind(exception.rule_id)
        .bind(exception.start_date)
        .bind(exception.end_date)
        .bind(exception.override_schedule_id)
        .bind(exception.created_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(exception))
    }

    pub(crate) async fn find_exception_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        rule_id: Uuid,
        slot: OccurrenceSlot,
    ) -> Result<Option<RecurrenceException>, CoreError> {
        let exception = sqlx::query_as(
            "SELECT * FROM recurrence_exceptions WHERE rule_id = $1 AND start_date = $2 AND end_date = $3",
        )
        .bind(rule_id)
        .bind(slot.start)
        .bind(slot.end)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(exception)
    }
}
