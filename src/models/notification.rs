//! Typed notifications fanned out to observing connections.

use serde::{Deserialize, Serialize};

use super::approval::ApprovalResult;
use super::stream::ToolCall;

/// A state change broadcast to all connections, or to one space when the
/// carrying conversation is scoped to a `group_slug`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A topic was created, saved, or deleted.
    TopicChanged {
        /// Affected topic.
        topic_id: String,
        /// Owning agent.
        agent_id: String,
        /// Scope, when the topic belongs to a space.
        group_slug: Option<String>,
    },
    /// A topic's stream started or stopped processing.
    StreamChanged {
        /// Affected topic.
        topic_id: String,
        /// Whether the stream is now processing.
        is_processing: bool,
        /// Scope, when the topic belongs to a space.
        group_slug: Option<String>,
    },
    /// A completed assistant message was appended to a conversation.
    NewMessage {
        /// Affected topic.
        topic_id: String,
        /// Chat the message belongs to.
        chat_id: i64,
        /// Counter value of the appended message.
        message_id: i64,
        /// Scope, when the topic belongs to a space.
        group_slug: Option<String>,
    },
    /// An approval request reached a terminal result.
    ApprovalResolved {
        /// Resolved approval id.
        approval_id: String,
        /// Owning topic.
        topic_id: String,
        /// Terminal outcome.
        result: ApprovalResult,
        /// Scope, when the topic belongs to a space.
        group_slug: Option<String>,
    },
    /// The agent announced tool calls mid-turn.
    ToolCalls {
        /// Affected topic.
        topic_id: String,
        /// Announced calls.
        tool_calls: Vec<ToolCall>,
        /// Scope, when the topic belongs to a space.
        group_slug: Option<String>,
    },
    /// A user prompt entered the conversation.
    UserMessage {
        /// Affected topic.
        topic_id: String,
        /// Display name of the sender.
        sender: String,
        /// Prompt text.
        text: String,
        /// Scope, when the topic belongs to a space.
        group_slug: Option<String>,
    },
}

impl Notification {
    /// Wire method name the transport delivers this notification under.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::TopicChanged { .. } => "OnTopicChanged",
            Self::StreamChanged { .. } => "OnStreamChanged",
            Self::NewMessage { .. } => "OnNewMessage",
            Self::ApprovalResolved { .. } => "OnApprovalResolved",
            Self::ToolCalls { .. } => "OnToolCalls",
            Self::UserMessage { .. } => "OnUserMessage",
        }
    }

    /// Space this notification is scoped to, when any.
    #[must_use]
    pub fn group_slug(&self) -> Option<&str> {
        match self {
            Self::TopicChanged { group_slug, .. }
            | Self::StreamChanged { group_slug, .. }
            | Self::NewMessage { group_slug, .. }
            | Self::ApprovalResolved { group_slug, .. }
            | Self::ToolCalls { group_slug, .. }
            | Self::UserMessage { group_slug, .. } => group_slug.as_deref(),
        }
    }
}
