//! Persisted topic catalog metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing one conversational topic, as listed by transports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TopicInfo {
    /// Opaque transport-assigned topic identifier.
    pub topic_id: String,
    /// Agent the topic dispatches to.
    pub agent_id: String,
    /// Transport-assigned chat identifier.
    pub chat_id: i64,
    /// Thread within the chat; 0 when absent.
    pub thread_id: i64,
    /// Display title shown in topic lists.
    pub title: String,
    /// Space the topic is scoped to.
    pub group_slug: Option<String>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TopicInfo {
    /// Construct topic metadata stamped with the current time.
    #[must_use]
    pub fn new(
        topic_id: impl Into<String>,
        agent_id: impl Into<String>,
        chat_id: i64,
        thread_id: i64,
        title: impl Into<String>,
        group_slug: Option<String>,
    ) -> Self {
        Self {
            topic_id: topic_id.into(),
            agent_id: agent_id.into(),
            chat_id,
            thread_id,
            title: title.into(),
            group_slug,
            updated_at: Utc::now(),
        }
    }
}
