use crate::error::CoreError;
use crate::models::Tag;
use crate::repository::{require_owner, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::TagRepository for SqliteRepository {
    async fn find_tags(&self, owner_id: &str) -> Result<Vec<Tag>, CoreError> {
        require_owner(owner_id)?;
        let tags = sqlx::query_as("SELECT * FROM tags WHERE owner_id = $1 ORDER BY title")
            .bind(owner_id)
            .fetch_all(self.pool())
            .await?;
        Ok(tags)
    }
}

/// Trimmed, non-empty, first occurrence wins.
fn normalize_titles(titles: &[String]) -> Vec<&str> {
    let mut seen = Vec::new();
    for title in titles.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !seen.contains(&title) {
            seen.push(title);
        }
    }
    seen
}

impl SqliteRepository {
    /// Find the owner's tag by title, creating it on first use
    pub(crate) async fn find_or_create_tag_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        owner_id: &str,
        title: &str,
    ) -> Result<Tag, CoreError> {
        sqlx::query(
            r#"INSERT INTO tags (id, owner_id, title, created_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id, title) DO NOTHING"#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(title)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        let tag = sqlx::query_as("SELECT * FROM tags WHERE owner_id = $1 AND title = $2")
            .bind(owner_id)
            .bind(title)
            .fetch_one(&mut **tx)
            .await?;
        Ok(tag)
    }

    pub(crate) async fn attach_tags_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        owner_id: &str,
        schedule_id: Uuid,
        titles: &[String],
    ) -> Result<(), CoreError> {
        for title in normalize_titles(titles) {
            let tag = Self::find_or_create_tag_in_transaction(tx, owner_id, title).await?;
            sqlx::query("INSERT OR IGNORE INTO schedule_tags (schedule_id, tag_id) VALUES ($1, $2)")
                .bind(schedule_id)
                .bind(tag.id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    pub(crate) async fn replace_tags_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        owner_id: &str,
        schedule_id: Uuid,
        titles: &[String],
    ) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM schedule_tags WHERE schedule_id = $1")
            .bind(schedule_id)
            .execute(&mut **tx)
            .await?;
        Self::attach_tags_in_transaction(tx, owner_id, schedule_id, titles).await
    }

    pub(crate) async fn tag_titles_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        schedule_id: Uuid,
    ) -> Result<Vec<String>, CoreError> {
        let titles: Vec<(String,)> = sqlx::query_as(
            r#"SELECT t.title FROM tags t
            JOIN schedule_tags st ON st.tag_id = t.id
            WHERE st.schedule_id = $1
            ORDER BY t.title"#,
        )
        .bind(schedule_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(titles.into_iter().map(|(t,)| t).collect())
    }
}
