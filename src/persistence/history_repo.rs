//! Chat history repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::chat::{ChatEntry, ChatRole};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for chat messages.
#[derive(Clone)]
pub struct HistoryRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    message_id: i64,
    role: String,
    content: String,
    sender_id: String,
    timestamp: String,
}

impl ChatMessageRow {
    /// Convert a database row into the domain model.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if role or timestamp parsing fails.
    fn into_entry(self) -> Result<ChatEntry> {
        let role = parse_role(&self.role)?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| AppError::Db(format!("invalid timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(ChatEntry {
            message_id: self.message_id,
            role,
            content: self.content,
            sender_id: self.sender_id,
            timestamp,
        })
    }
}

/// Parse a role string into the domain enum.
fn parse_role(s: &str) -> Result<ChatRole> {
    match s {
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        "tool" => Ok(ChatRole::Tool),
        "system" => Ok(ChatRole::System),
        other => Err(AppError::Db(format!("invalid chat role: {other}"))),
    }
}

/// Serialize a role enum to its database string.
fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
        ChatRole::System => "system",
    }
}

impl HistoryRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Messages of one conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self, key: &str) -> Result<Vec<ChatEntry>> {
        let rows: Vec<ChatMessageRow> = sqlx::query_as(
            "SELECT message_id, role, content, sender_id, timestamp
             FROM chat_message WHERE history_key = ?1 ORDER BY id ASC",
        )
        .bind(key)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(ChatMessageRow::into_entry).collect()
    }

    /// Append messages to one conversation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if any insert fails.
    pub async fn append(&self, key: &str, entries: &[ChatEntry]) -> Result<()> {
        for entry in entries {
            sqlx::query(
                "INSERT INTO chat_message
                 (history_key, message_id, role, content, sender_id, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(key)
            .bind(entry.message_id)
            .bind(role_str(entry.role))
            .bind(&entry.content)
            .bind(&entry.sender_id)
            .bind(entry.timestamp.to_rfc3339())
            .execute(self.db.as_ref())
            .await?;
        }
        Ok(())
    }

    /// Delete one conversation's messages.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM chat_message WHERE history_key = ?1")
            .bind(key)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}
