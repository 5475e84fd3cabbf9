//! `SQLite` persistence for chat history and the topic catalog.

use async_trait::async_trait;

use crate::models::chat::ChatEntry;
use crate::models::topic::TopicInfo;
use crate::Result;

pub mod db;
pub mod history_repo;
pub mod schema;
pub mod store;
pub mod topic_repo;

/// Deterministic storage key for one conversation.
#[must_use]
pub fn history_key(agent_id: &str, chat_id: i64, thread_id: i64) -> String {
    format!("agent-key:{agent_id}:{chat_id}:{thread_id}")
}

/// History store contract consumed by the gateway core.
///
/// Read failures are treated as degradable by callers (logged, empty
/// result); write failures propagate so the user sees them.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Messages of one conversation, oldest first.
    async fn get_messages(&self, key: &str) -> Result<Vec<ChatEntry>>;

    /// Append messages to one conversation.
    async fn add_messages(&self, key: &str, entries: &[ChatEntry]) -> Result<()>;

    /// Delete one conversation's messages.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Topic catalog for an agent, optionally filtered to one space.
    async fn get_all_topics(
        &self,
        agent_id: &str,
        group_slug: Option<&str>,
    ) -> Result<Vec<TopicInfo>>;

    /// Insert or update topic metadata.
    async fn save_topic(&self, topic: &TopicInfo) -> Result<()>;

    /// Remove topic metadata.
    async fn delete_topic(&self, agent_id: &str, chat_id: i64, topic_id: &str) -> Result<()>;
}
