use crate::error::CoreError;
use crate::models::{
    NewSchedule, OccurrenceSlot, RecurrenceRule, Reminder, RepeatSpec, Schedule, ScheduleDetail,
};
use crate::recurrence::{ExceptionSet, OccurrenceGenerator, RecurrencePattern};
use crate::repository::{require_owner, ExceptionRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ScheduleRepository for SqliteRepository {
    #[tracing::instrument(skip(self, data), fields(title = %data.title))]
    async fn create_schedule(&self, owner_id: &str, data: NewSchedule) -> Result<Schedule, CoreError> {
        require_owner(owner_id)?;
        data.validate()?;
        if let Some(repeat) = &data.repeat {
            RecurrencePattern::from_spec(data.start_date, repeat)?;
        }

        let mut tx = self.pool().begin().await?;
        let (schedule, _) = Self::insert_schedule_in_transaction(&mut tx, owner_id, data).await?;
        tx.commit().await?;

        tracing::info!(schedule_id = %schedule.id, "created schedule");
        Ok(schedule)
    }

    async fn find_schedule(&self, owner_id: &str, id: Uuid) -> Result<Option<Schedule>, CoreError> {
        require_owner(owner_id)?;
        let schedule = sqlx::query_as("SELECT * FROM schedules WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(schedule)
    }

    async fn find_schedules_by_short_id_prefix(&self, owner_id: &str, short_id: &str) -> Result<Vec<Schedule>, CoreError> {
        require_owner(owner_id)?;
        // Ids are stored as 16-byte blobs; match on their hex form.
        let hex: String = short_id
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_lowercase();
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Vec::new());
        }

        let mut pattern = String::with_capacity(hex.len() + 1);
        pattern.push_str(&hex);
        pattern.push('%');

        let schedules: Vec<Schedule> = sqlx::query_as(
            "SELECT * FROM schedules WHERE owner_id = $1 AND lower(hex(id)) LIKE $2 ORDER BY start_date",
        )
        .bind(owner_id)
        .bind(pattern)
        .fetch_all(self.pool())
        .await?;
        Ok(schedules)
    }

    async fn find_schedule_detail(&self, owner_id: &str, id: Uuid) -> Result<ScheduleDetail, CoreError> {
        let schedule = self
            .find_schedule(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::ScheduleNotFound(id.to_string()))?;

        let rule: Option<RecurrenceRule> =
            sqlx::query_as("SELECT * FROM recurrence_rules WHERE schedule_id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        let exceptions = match &rule {
            Some(rule) => self.find_exceptions(rule.id).await?,
            None => Vec::new(),
        };

        let tags = sqlx::query_as(
            r#"SELECT t.* FROM tags t
            JOIN schedule_tags st ON st.tag_id = t.id
            WHERE st.schedule_id = $1
            ORDER BY t.title"#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        let reminders: Vec<Reminder> =
            sqlx::query_as("SELECT * FROM reminders WHERE schedule_id = $1 ORDER BY minutes_before")
                .bind(id)
                .fetch_all(self.pool())
                .await?;

        let first_occurrence = match &rule {
            Some(rule) => {
                let pattern = RecurrencePattern::compile(schedule.start_date, rule)?;
                let duration = schedule.duration();
                OccurrenceGenerator::new(pattern, ExceptionSet::from_exceptions(&exceptions))
                    .first_occurrence()
                    .map(|start| OccurrenceSlot::new(start, start + duration))
            }
            None => Some(OccurrenceSlot::new(schedule.start_date, schedule.end_date)),
        };

        Ok(ScheduleDetail {
            schedule,
            rule,
            exceptions,
            tags,
            reminders,
            first_occurrence,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_schedule(&self, owner_id: &str, id: Uuid) -> Result<(), CoreError> {
        require_owner(owner_id)?;
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ScheduleNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl SqliteRepository {
    /// Insert a schedule with its tags, rule and reminders within an existing transaction
    pub(crate) async fn insert_schedule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        owner_id: &str,
        data: NewSchedule,
    ) -> Result<(Schedule, Option<RecurrenceRule>), CoreError> {
        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::now_v7(),
            owner_id: owner_id.to_string(),
            title: data.title,
            note: data.note,
            color: data.color,
            importance: data.importance,
            start_date: data.start_date,
            end_date: data.end_date,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO schedules (id, owner_id, title, note, color, importance, start_date, end_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(schedule.id)
        .bind(&schedule.owner_id)
        .bind(&schedule.title)
        .bind(&schedule.note)
        .bind(schedule.color)
        .bind(schedule.importance)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&mut **tx)
        .await?;

        Self::attach_tags_in_transaction(tx, owner_id, schedule.id, &data.tags).await?;

        let rule = match &data.repeat {
            Some(repeat) => Some(Self::insert_rule_in_transaction(tx, schedule.id, repeat).await?),
            None => None,
        };

        Self::insert_reminders_in_transaction(tx, schedule.id, &data.reminders).await?;

        Ok((schedule, rule))
    }

    pub(crate) async fn insert_rule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule_id: Uuid,
        repeat: &RepeatSpec,
    ) -> Result<RecurrenceRule, CoreError> {
        let now = Utc::now();
        let rule = RecurrenceRule {
            id: Uuid::now_v7(),
            schedule_id,
            frequency: repeat.frequency.to_string(),
            interval: repeat.interval,
            until: repeat.until,
            count: repeat.count,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO recurrence_rules (id, schedule_id, frequency, interval, until, count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(rule.id)
        .bind(rule.schedule_id)
        .bind(&rule.frequency)
        .bind(rule.interval)
        .bind(rule.until)
        .bind(rule.count)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(rule)
    }

    pub(crate) async fn insert_reminders_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule_id: Uuid,
        minutes: &[i64],
    ) -> Result<(), CoreError> {
        if minutes.is_empty() {
            return Ok(());
        }

        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO reminders (id, schedule_id, minutes_before) ");
        query_builder.push_values(minutes.iter(), |mut b, m| {
            b.push_bind(Uuid::now_v7()).push_bind(schedule_id).push_bind(*m);
        });
        query_builder.build().execute(&mut **tx).await?;
        Ok(())
    }

    pub(crate) async fn replace_reminders_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule_id: Uuid,
        minutes: &[i64],
    ) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM reminders WHERE schedule_id = $1")
            .bind(schedule_id)
            .execute(&mut **tx)
            .await?;
        Self::insert_reminders_in_transaction(tx, schedule_id, minutes).await
    }

    /// Find an owner's schedule within an existing transaction
    pub(crate) async fn find_schedule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        owner_id: &str,
        id: Uuid,
    ) -> Result<Option<Schedule>, CoreError> {
        let schedule = sqlx::query_as("SELECT * FROM schedules WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(schedule)
    }

    pub(crate) async fn find_rule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule_id: Uuid,
    ) -> Result<Option<RecurrenceRule>, CoreError> {
        let rule = sqlx::query_as("SELECT * FROM recurrence_rules WHERE schedule_id = $1")
            .bind(schedule_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(rule)
    }

    pub(crate) async fn reminder_minutes_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule_id: Uuid,
    ) -> Result<Vec<i64>, CoreError> {
        let minutes: Vec<(i64,)> =
            sqlx::query_as("SELECT minutes_before FROM reminders WHERE schedule_id = $1 ORDER BY minutes_before")
                .bind(schedule_id)
                .fetch_all(&mut **tx)
                .await?;
        Ok(minutes.into_iter().map(|(m,)| m).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::establish_connection;
    use crate::models::{Color, Frequency};
    use crate::repository::ScheduleRepository;
    use chrono::{DateTime, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    async fn setup() -> SqliteRepository {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        SqliteRepository::new(pool)
    }

    #[tokio::test]
    async fn create_and_find_with_attachments() {
        let repo = setup().await;
        let mut data = NewSchedule::new("Gym", at(2024, 1, 1, 7), at(2024, 1, 1, 8));
        data.color = Color::Orange;
        data.tags = vec!["health".to_string(), "health".to_string(), " ".to_string()];
        data.reminders = vec![15, 60];
        data.repeat = Some(RepeatSpec::new(Frequency::Daily));

        let schedule = repo.create_schedule("alice", data).await.unwrap();
        let detail = repo.find_schedule_detail("alice", schedule.id).await.unwrap();

        assert_eq!(detail.schedule.color, Color::Orange);
        assert_eq!(detail.rule.unwrap().frequency, "daily");
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.tags[0].title, "health");
        assert_eq!(
            detail.reminders.iter().map(|r| r.minutes_before).collect::<Vec<_>>(),
            vec![15, 60]
        );
        assert_eq!(
            detail.first_occurrence,
            Some(OccurrenceSlot::new(at(2024, 1, 1, 7), at(2024, 1, 1, 8)))
        );
    }

    #[tokio::test]
    async fn other_owners_cannot_see_a_schedule() {
        let repo = setup().await;
        let schedule = repo
            .create_schedule("alice", NewSchedule::new("Private", at(2024, 1, 1, 7), at(2024, 1, 1, 8)))
            .await
            .unwrap();

        assert!(repo.find_schedule("bob", schedule.id).await.unwrap().is_none());
        assert!(matches!(
            repo.find_schedule_detail("bob", schedule.id).await,
            Err(CoreError::ScheduleNotFound(_))
        ));
        assert!(matches!(
            repo.delete_schedule("bob", schedule.id).await,
            Err(CoreError::ScheduleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_owner_is_unauthorized() {
        let repo = setup().await;
        let result = repo
            .create_schedule("", NewSchedule::new("x", at(2024, 1, 1, 7), at(2024, 1, 1, 8)))
            .await;
        assert!(matches!(result, Err(CoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn invalid_rule_is_rejected_before_writing() {
        let repo = setup().await;
        let mut data = NewSchedule::new("Bad", at(2024, 1, 1, 7), at(2024, 1, 1, 8));
        let mut repeat = RepeatSpec::new(Frequency::Weekly);
        repeat.interval = Some(0);
        data.repeat = Some(repeat);

        assert!(matches!(
            repo.create_schedule("alice", data).await,
            Err(CoreError::InvalidInterval(0))
        ));
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schedules")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn short_id_prefix_lookup() {
        let repo = setup().await;
        let schedule = repo
            .create_schedule("alice", NewSchedule::new("Dentist", at(2024, 3, 1, 9), at(2024, 3, 1, 10)))
            .await
            .unwrap();
        let prefix = &schedule.id.to_string()[..8];

        let found = repo.find_schedules_by_short_id_prefix("alice", prefix).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, schedule.id);

        assert!(repo.find_schedules_by_short_id_prefix("bob", prefix).await.unwrap().is_empty());
        assert!(repo.find_schedules_by_short_id_prefix("alice", "zz%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_rule_and_reminders() {
        let repo = setup().await;
        let mut data = NewSchedule::new("Gym", at(2024, 1, 1, 7), at(2024, 1, 1, 8));
        data.repeat = Some(RepeatSpec::new(Frequency::Weekly));
        data.reminders = vec![5];
        let schedule = repo.create_schedule("alice", data).await.unwrap();

        repo.delete_schedule("alice", schedule.id).await.unwrap();

        let rules: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recurrence_rules")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        let reminders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reminders")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!((rules.0, reminders.0), (0, 0));
    }
}
