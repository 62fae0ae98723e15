use crate::error::CoreError;
use crate::models::{RecurrenceException, RecurrenceRule, Schedule, ScheduleOccurrences};
use crate::recurrence::{expand_schedule, ExceptionSet, QueryWindow};
use crate::repository::{require_owner, SqliteRepository};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
impl super::OccurrenceRepository for SqliteRepository {
    #[tracing::instrument(skip(self, window), fields(start = %window.start(), end = %window.end()))]
    async fn list_occurrences(
        &self,
        owner_id: &str,
        window: QueryWindow,
        tag_titles: &[String],
    ) -> Result<Vec<ScheduleOccurrences>, CoreError> {
        require_owner(owner_id)?;

        // A recurring schedule that starts before the window may still have
        // occurrences inside it; a single one must overlap it.
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"SELECT s.* FROM schedules s
            LEFT JOIN recurrence_rules r ON r.schedule_id = s.id
            WHERE s.owner_id = "#,
        );
        qb.push_bind(owner_id);
        qb.push(" AND s.start_date <= ");
        qb.push_bind(window.end());
        qb.push(" AND (r.id IS NOT NULL OR s.end_date >= ");
        qb.push_bind(window.start());
        qb.push(")");

        if !tag_titles.is_empty() {
            qb.push(
                r#" AND s.id IN (SELECT st.schedule_id FROM schedule_tags st
                JOIN tags t ON t.id = st.tag_id
                WHERE t.title IN ("#,
            );
            let mut separated = qb.separated(", ");
            for title in tag_titles {
                separated.push_bind(title.trim());
            }
            separated.push_unseparated("))");
        }
        qb.push(" ORDER BY s.start_date, s.id");

        let schedules: Vec<Schedule> = qb.build_query_as().fetch_all(self.pool()).await?;
        if schedules.is_empty() {
            return Ok(Vec::new());
        }

        let rules = self.rules_for(&schedules).await?;
        let exceptions = self.exceptions_for(&rules).await?;

        let empty = ExceptionSet::new();
        let mut result = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            let rule = rules.get(&schedule.id);
            let exception_set = rule
                .and_then(|r| exceptions.get(&r.id))
                .unwrap_or(&empty);

            let dates = expand_schedule(&schedule, rule, exception_set, &window)?;
            if dates.is_empty() {
                continue;
            }
            result.push(ScheduleOccurrences {
                id: schedule.id,
                title: schedule.title,
                color: schedule.color,
                dates,
            });
        }

        tracing::debug!(schedules = result.len(), "listed occurrences");
        Ok(result)
    }
}

impl SqliteRepository {
    /// Rules of the given schedules, keyed by schedule id
    async fn rules_for(&self, schedules: &[Schedule]) -> Result<HashMap<Uuid, RecurrenceRule>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM recurrence_rules WHERE schedule_id IN (");
        let mut separated = qb.separated(", ");
        for schedule in schedules {
            separated.push_bind(schedule.id);
        }
        separated.push_unseparated(")");

        let rules: Vec<RecurrenceRule> = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(rules.into_iter().map(|r| (r.schedule_id, r)).collect())
    }

    /// Exception sets of the given rules, keyed by rule id
    async fn exceptions_for(
        &self,
        rules: &HashMap<Uuid, RecurrenceRule>,
    ) -> Result<HashMap<Uuid, ExceptionSet>, CoreError> {
        let rule_ids: Vec<Uuid> = rules.values().map(|r| r.id).collect();
        if rule_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM recurrence_exceptions WHERE rule_id IN (");
        let mut separated = qb.separated(", ");
        for id in &rule_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<RecurrenceException> = qb.build_query_as().fetch_all(self.pool()).await?;
        let mut sets: HashMap<Uuid, ExceptionSet> = HashMap::new();
        for row in rows {
            sets.entry(row.rule_id).or_default().insert(row.start_date);
        }
        Ok(sets)
    }
}
