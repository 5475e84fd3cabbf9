//! Session model binding a transport topic to an agent conversation.

use serde::{Deserialize, Serialize};

/// Immutable binding of a transport-assigned topic to an agent/chat/thread
/// triple, plus the optional space the conversation is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Opaque transport-assigned topic identifier.
    pub topic_id: String,
    /// Agent the topic dispatches to.
    pub agent_id: String,
    /// Transport-assigned chat identifier.
    pub chat_id: i64,
    /// Thread within the chat; 0 when the transport has no threads.
    pub thread_id: i64,
    /// Space that scopes notifications for this conversation.
    pub group_slug: Option<String>,
}

impl Session {
    /// Construct a session binding.
    #[must_use]
    pub fn new(
        topic_id: impl Into<String>,
        agent_id: impl Into<String>,
        chat_id: i64,
        thread_id: i64,
        group_slug: Option<String>,
    ) -> Self {
        Self {
            topic_id: topic_id.into(),
            agent_id: agent_id.into(),
            chat_id,
            thread_id,
            group_slug,
        }
    }
}
