use crate::error::CoreError;
use crate::modifier::{ModificationPlan, RuleChange, ScheduleModifier};
use crate::models::{EditedFields, ModifyOutcome, ModifyType, RecurrenceException, Schedule};
use crate::repository::{require_owner, SqliteRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ModificationRepository for SqliteRepository {
    #[tracing::instrument(skip(self, edited))]
    async fn modify_schedule(
        &self,
        owner_id: &str,
        schedule_id: Uuid,
        modify_type: ModifyType,
        edited: EditedFields,
    ) -> Result<ModifyOutcome, CoreError> {
        require_owner(owner_id)?;
        let mut tx = self.pool().begin().await?;

        // Take the write lock before reading so concurrent edits of the same
        // series run one after the other.
        Self::lock_schedule_in_transaction(&mut tx, owner_id, schedule_id).await?;

        let schedule = Self::find_schedule_in_transaction(&mut tx, owner_id, schedule_id)
            .await?
            .ok_or_else(|| CoreError::ScheduleNotFound(schedule_id.to_string()))?;
        let rule = Self::find_rule_in_transaction(&mut tx, schedule_id).await?;
        let tags = Self::tag_titles_in_transaction(&mut tx, schedule_id).await?;
        let reminders = Self::reminder_minutes_in_transaction(&mut tx, schedule_id).await?;

        let plan = ScheduleModifier::new(&schedule, rule.as_ref())
            .with_attachments(tags, reminders)
            .plan(modify_type, &edited)?;

        match plan {
            ModificationPlan::Detach {
                rule_id,
                slot,
                schedule: detached,
            } => {
                if let Some(existing) = Self::find_exception_in_transaction(&mut tx, rule_id, slot).await? {
                    tx.rollback().await?;
                    tracing::info!(%schedule_id, exception_id = %existing.id, "occurrence already detached");
                    return Ok(already_applied(&schedule, &existing));
                }

                let (created, _) = Self::insert_schedule_in_transaction(&mut tx, owner_id, detached).await?;
                let inserted =
                    Self::insert_exception_in_transaction(&mut tx, rule_id, slot, Some(created.id)).await?;

                let Some(exception) = inserted else {
                    // The unique key was taken between the read and the insert.
                    tx.rollback().await?;
                    let mut tx = self.pool().begin().await?;
                    let existing = Self::find_exception_in_transaction(&mut tx, rule_id, slot)
                        .await?
                        .ok_or(CoreError::StorageFailure(sqlx::Error::RowNotFound))?;
                    tx.rollback().await?;
                    tracing::warn!(%schedule_id, "concurrent detach of the same occurrence, rolled back");
                    return Ok(already_applied(&schedule, &existing));
                };

                tx.commit().await?;
                tracing::info!(%schedule_id, detached_id = %created.id, slot_start = %slot.start, "detached occurrence");
                Ok(ModifyOutcome::Detached {
                    schedule_id: created.id,
                    exception_id: exception.id,
                })
            }
            ModificationPlan::Split {
                rule_id,
                truncated_until,
                schedule: continued,
            } => {
                let cut = continued.start_date;
                Self::truncate_rule_in_transaction(&mut tx, rule_id, truncated_until).await?;
                let (created, new_rule) = Self::insert_schedule_in_transaction(&mut tx, owner_id, continued).await?;
                let new_rule = new_rule.ok_or(CoreError::RuleNotFound(created.id))?;
                let moved = Self::move_exceptions_in_transaction(&mut tx, rule_id, new_rule.id, cut).await?;
                tx.commit().await?;

                tracing::info!(
                    %schedule_id,
                    forked_id = %created.id,
                    until = %truncated_until,
                    moved_exceptions = moved,
                    "forked series"
                );
                Ok(ModifyOutcome::Forked {
                    original_id: schedule_id,
                    schedule_id: created.id,
                })
            }
            ModificationPlan::EditSeries {
                schedule: updated,
                rule: change,
                tags,
                reminders,
            } => {
                Self::update_schedule_fields_in_transaction(&mut tx, &updated).await?;

                match change {
                    RuleChange::Keep => {}
                    RuleChange::Replace { rule_id, repeat } => {
                        sqlx::query(
                            r#"UPDATE recurrence_rules
                            SET frequency = $1, interval = $2, until = $3, count = $4, updated_at = $5
                            WHERE id = $6"#,
                        )
                        .bind(repeat.frequency.to_string())
                        .bind(repeat.interval)
                        .bind(repeat.until)
                        .bind(repeat.count)
                        .bind(Utc::now())
                        .bind(rule_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                    RuleChange::Attach(repeat) => {
                        Self::insert_rule_in_transaction(&mut tx, schedule_id, &repeat).await?;
                    }
                }

                if let Some(tags) = &tags {
                    Self::replace_tags_in_transaction(&mut tx, owner_id, schedule_id, tags).await?;
                }
                if let Some(reminders) = &reminders {
                    Self::replace_reminders_in_transaction(&mut tx, schedule_id, reminders).await?;
                }

                tx.commit().await?;
                tracing::info!(%schedule_id, "updated series in place");
                Ok(ModifyOutcome::Updated { schedule_id })
            }
        }
    }
}

fn already_applied(schedule: &Schedule, existing: &RecurrenceException) -> ModifyOutcome {
    ModifyOutcome::AlreadyApplied {
        schedule_id: existing.override_schedule_id.unwrap_or(schedule.id),
        exception_id: existing.id,
    }
}

impl SqliteRepository {
    /// No-op write that makes this transaction the writer, scoped to the owner
    async fn lock_schedule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        owner_id: &str,
        schedule_id: Uuid,
    ) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE schedules SET updated_at = updated_at WHERE id = $1 AND owner_id = $2")
            .bind(schedule_id)
            .bind(owner_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::ScheduleNotFound(schedule_id.to_string()));
        }
        Ok(())
    }

    async fn truncate_rule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        rule_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        sqlx::query("UPDATE recurrence_rules SET until = $1, updated_at = $2 WHERE id = $3")
            .bind(until)
            .bind(Utc::now())
            .bind(rule_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Hands exceptions at or after `cut` over to the rule continuing the
    /// series, so detached occurrences stay suppressed after a split.
    async fn move_exceptions_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        from_rule_id: Uuid,
        to_rule_id: Uuid,
        cut: DateTime<Utc>,
    ) -> Result<u64, CoreError> {
        let result = sqlx::query("UPDATE recurrence_exceptions SET rule_id = $1 WHERE rule_id = $2 AND start_date >= $3")
            .bind(to_rule_id)
            .bind(from_rule_id)
            .bind(cut)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_schedule_fields_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule: &Schedule,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE schedules
            SET title = $1, note = $2, color = $3, importance = $4, start_date = $5, end_date = $6, updated_at = $7
            WHERE id = $8 AND owner_id = $9"#,
        )
        .bind(&schedule.title)
        .bind(&schedule.note)
        .bind(schedule.color)
        .bind(schedule.importance)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.updated_at)
        .bind(schedule.id)
        .bind(&schedule.owner_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
