//! Persisted chat history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a chat history entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Message written by a user.
    User,
    /// Message produced by the agent.
    Assistant,
    /// Tool output recorded mid-turn.
    Tool,
    /// System instruction.
    System,
}

/// One persisted message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChatEntry {
    /// Process-wide message counter value at creation.
    pub message_id: i64,
    /// Author role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
    /// Identifier of the author (user id or agent id).
    pub sender_id: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    /// Construct an entry stamped with the current time.
    #[must_use]
    pub fn new(
        message_id: i64,
        role: ChatRole,
        content: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            role,
            content: content.into(),
            sender_id: sender_id.into(),
            timestamp: Utc::now(),
        }
    }
}
