//! `SQLite`-backed implementation of the [`HistoryStore`] contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::chat::ChatEntry;
use crate::models::topic::TopicInfo;
use crate::Result;

use super::db::Database;
use super::history_repo::HistoryRepo;
use super::topic_repo::TopicRepo;
use super::HistoryStore;

/// History store over one `SQLite` pool.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    messages: HistoryRepo,
    topics: TopicRepo,
}

impl SqliteHistoryStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            messages: HistoryRepo::new(Arc::clone(&db)),
            topics: TopicRepo::new(db),
        }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn get_messages(&self, key: &str) -> Result<Vec<ChatEntry>> {
        self.messages.list(key).await
    }

    async fn add_messages(&self, key: &str, entries: &[ChatEntry]) -> Result<()> {
        self.messages.append(key, entries).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.messages.delete(key).await
    }

    async fn get_all_topics(
        &self,
        agent_id: &str,
        group_slug: Option<&str>,
    ) -> Result<Vec<TopicInfo>> {
        self.topics.list(agent_id, group_slug).await
    }

    async fn save_topic(&self, topic: &TopicInfo) -> Result<()> {
        self.topics.upsert(topic).await
    }

    async fn delete_topic(&self, agent_id: &str, chat_id: i64, topic_id: &str) -> Result<()> {
        self.topics.delete(agent_id, chat_id, topic_id).await
    }
}
