//! Topic catalog repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::topic::TopicInfo;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for topic metadata.
#[derive(Clone)]
pub struct TopicRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TopicRow {
    topic_id: String,
    agent_id: String,
    chat_id: i64,
    thread_id: i64,
    title: String,
    group_slug: Option<String>,
    updated_at: String,
}

impl TopicRow {
    /// Convert a database row into the domain model.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if timestamp parsing fails.
    fn into_topic(self) -> Result<TopicInfo> {
        let updated_at = chrono::DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| AppError::Db(format!("invalid updated_at: {e}")))?
            .with_timezone(&Utc);

        Ok(TopicInfo {
            topic_id: self.topic_id,
            agent_id: self.agent_id,
            chat_id: self.chat_id,
            thread_id: self.thread_id,
            title: self.title,
            group_slug: self.group_slug,
            updated_at,
        })
    }
}

impl TopicRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or update a topic record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn upsert(&self, topic: &TopicInfo) -> Result<()> {
        sqlx::query(
            "INSERT INTO topic
             (topic_id, agent_id, chat_id, thread_id, title, group_slug, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (topic_id) DO UPDATE SET
             agent_id = ?2, chat_id = ?3, thread_id = ?4, title = ?5,
             group_slug = ?6, updated_at = ?7",
        )
        .bind(&topic.topic_id)
        .bind(&topic.agent_id)
        .bind(topic.chat_id)
        .bind(topic.thread_id)
        .bind(&topic.title)
        .bind(&topic.group_slug)
        .bind(topic.updated_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Topics for an agent, optionally restricted to one space, most
    /// recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self, agent_id: &str, group_slug: Option<&str>) -> Result<Vec<TopicInfo>> {
        let rows: Vec<TopicRow> = if let Some(group) = group_slug {
            sqlx::query_as(
                "SELECT * FROM topic WHERE agent_id = ?1 AND group_slug = ?2
                 ORDER BY updated_at DESC",
            )
            .bind(agent_id)
            .bind(group)
            .fetch_all(self.db.as_ref())
            .await?
        } else {
            sqlx::query_as("SELECT * FROM topic WHERE agent_id = ?1 ORDER BY updated_at DESC")
                .bind(agent_id)
                .fetch_all(self.db.as_ref())
                .await?
        };

        rows.into_iter().map(TopicRow::into_topic).collect()
    }

    /// Remove a topic record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, agent_id: &str, chat_id: i64, topic_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM topic WHERE agent_id = ?1 AND chat_id = ?2 AND topic_id = ?3")
            .bind(agent_id)
            .bind(chat_id)
            .bind(topic_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}
