//! Inbound hub requests, one JSON object per WebSocket text frame.

use serde::Deserialize;

use crate::models::approval::ApprovalResult;
use crate::models::topic::TopicInfo;

/// A client request, tagged by `type`. Every request carries a client-chosen
/// `id` echoed back on its responses.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Attach a user id to the connection.
    RegisterUser {
        /// Request correlation id.
        id: String,
        /// User identifier; must be non-empty.
        user_id: String,
    },
    /// List configured agents.
    GetAgents {
        /// Request correlation id.
        id: String,
    },
    /// Check an agent id against the catalog.
    ValidateAgent {
        /// Request correlation id.
        id: String,
        /// Agent id to check.
        agent_id: String,
    },
    /// Bind a topic to an agent/chat/thread triple.
    StartSession {
        /// Request correlation id.
        id: String,
        /// Agent to dispatch to.
        agent_id: String,
        /// Transport-assigned topic id.
        topic_id: String,
        /// Transport-assigned chat id.
        chat_id: i64,
        /// Thread within the chat; 0 when absent.
        thread_id: i64,
        /// Space to join along with the session.
        #[serde(default)]
        group_slug: Option<String>,
    },
    /// Move the connection into a named space.
    JoinSpace {
        /// Request correlation id.
        id: String,
        /// Space to join.
        group_slug: String,
    },
    /// Conversation history (user/assistant entries).
    GetHistory {
        /// Request correlation id.
        id: String,
        /// Owning agent.
        agent_id: String,
        /// Chat id.
        chat_id: i64,
        /// Thread id.
        thread_id: i64,
    },
    /// Topic catalog for an agent.
    GetAllTopics {
        /// Request correlation id.
        id: String,
        /// Owning agent.
        agent_id: String,
        /// Restrict to one space.
        #[serde(default)]
        group_slug: Option<String>,
    },
    /// Whether a topic has an in-flight stream.
    IsProcessing {
        /// Request correlation id.
        id: String,
        /// Topic to check.
        topic_id: String,
    },
    /// Atomic stream snapshot for resumption.
    GetStreamState {
        /// Request correlation id.
        id: String,
        /// Topic to snapshot.
        topic_id: String,
    },
    /// Pending-approval prefix plus live tail of a topic's stream.
    ResumeStream {
        /// Request correlation id.
        id: String,
        /// Topic to resume.
        topic_id: String,
    },
    /// Enqueue a prompt and stream the response.
    SendMessage {
        /// Request correlation id.
        id: String,
        /// Topic to prompt.
        topic_id: String,
        /// Prompt text.
        text: String,
        /// Correlation id echoed into the prompt record.
        #[serde(default)]
        correlation_id: Option<String>,
    },
    /// Fire-and-forget prompt enqueue.
    EnqueueMessage {
        /// Request correlation id.
        id: String,
        /// Topic to prompt.
        topic_id: String,
        /// Prompt text.
        text: String,
        /// Correlation id echoed into the prompt record.
        #[serde(default)]
        correlation_id: Option<String>,
    },
    /// Cancel a topic's in-flight stream.
    CancelTopic {
        /// Request correlation id.
        id: String,
        /// Topic to cancel.
        topic_id: String,
    },
    /// End a session and delete its persisted state.
    DeleteTopic {
        /// Request correlation id.
        id: String,
        /// Owning agent.
        agent_id: String,
        /// Topic to delete.
        topic_id: String,
        /// Chat id.
        chat_id: i64,
        /// Thread id.
        thread_id: i64,
    },
    /// Persist topic metadata.
    SaveTopic {
        /// Request correlation id.
        id: String,
        /// Metadata to persist.
        topic: TopicInfo,
        /// Whether the topic is newly created.
        is_new: bool,
    },
    /// Resolve a pending approval.
    RespondToApproval {
        /// Request correlation id.
        id: String,
        /// Approval to resolve.
        approval_id: String,
        /// Decision.
        result: ApprovalResult,
    },
    /// Whether an approval is still pending.
    IsApprovalPending {
        /// Request correlation id.
        id: String,
        /// Approval to check.
        approval_id: String,
    },
    /// First unresolved approval request for a topic.
    GetPendingApprovalForTopic {
        /// Request correlation id.
        id: String,
        /// Topic to check.
        topic_id: String,
    },
}
