//! Typed notification fan-out over the transport's two delivery
//! primitives: broadcast to all connections, or to one named group.

use std::sync::Arc;

use tracing::error;

use crate::models::approval::ApprovalResult;
use crate::models::notification::Notification;
use crate::models::stream::ToolCall;

/// Delivery primitives the transport layer provides.
pub trait Notifier: Send + Sync {
    /// Broadcast a method/payload pair to every connected client.
    fn send_all(&self, method: &str, payload: &serde_json::Value);

    /// Broadcast restricted to the connections of one group.
    fn send_to_group(&self, group_slug: &str, method: &str, payload: &serde_json::Value);
}

/// Notifier that drops everything; used by the one-shot CLI and tests.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send_all(&self, _method: &str, _payload: &serde_json::Value) {}

    fn send_to_group(&self, _group_slug: &str, _method: &str, _payload: &serde_json::Value) {}
}

/// Typed helpers over a [`Notifier`].
///
/// A notification carrying a group slug goes to that group only; all
/// others are broadcast. Nothing fans out twice.
#[derive(Clone)]
pub struct Notifications {
    sink: Arc<dyn Notifier>,
}

impl Notifications {
    /// Wrap a transport-provided notifier.
    #[must_use]
    pub fn new(sink: Arc<dyn Notifier>) -> Self {
        Self { sink }
    }

    fn dispatch(&self, notification: &Notification) {
        let payload = match serde_json::to_value(notification) {
            Ok(value) => value,
            Err(err) => {
                error!(%err, method = notification.method(), "notification serialization failed");
                return;
            }
        };
        match notification.group_slug() {
            Some(group) => self.sink.send_to_group(group, notification.method(), &payload),
            None => self.sink.send_all(notification.method(), &payload),
        }
    }

    /// A topic was created, saved, or deleted.
    pub fn topic_changed(&self, topic_id: &str, agent_id: &str, group_slug: Option<String>) {
        self.dispatch(&Notification::TopicChanged {
            topic_id: topic_id.to_owned(),
            agent_id: agent_id.to_owned(),
            group_slug,
        });
    }

    /// A topic's stream started or stopped processing.
    pub fn stream_changed(&self, topic_id: &str, is_processing: bool, group_slug: Option<String>) {
        self.dispatch(&Notification::StreamChanged {
            topic_id: topic_id.to_owned(),
            is_processing,
            group_slug,
        });
    }

    /// A completed assistant message was appended to a conversation.
    pub fn new_message(
        &self,
        topic_id: &str,
        chat_id: i64,
        message_id: i64,
        group_slug: Option<String>,
    ) {
        self.dispatch(&Notification::NewMessage {
            topic_id: topic_id.to_owned(),
            chat_id,
            message_id,
            group_slug,
        });
    }

    /// An approval request reached a terminal result.
    pub fn approval_resolved(
        &self,
        approval_id: &str,
        topic_id: &str,
        result: ApprovalResult,
        group_slug: Option<String>,
    ) {
        self.dispatch(&Notification::ApprovalResolved {
            approval_id: approval_id.to_owned(),
            topic_id: topic_id.to_owned(),
            result,
            group_slug,
        });
    }

    /// The agent announced tool calls mid-turn.
    pub fn tool_calls(&self, topic_id: &str, tool_calls: Vec<ToolCall>, group_slug: Option<String>) {
        self.dispatch(&Notification::ToolCalls {
            topic_id: topic_id.to_owned(),
            tool_calls,
            group_slug,
        });
    }

    /// A user prompt entered the conversation.
    pub fn user_message(
        &self,
        topic_id: &str,
        sender: &str,
        text: &str,
        group_slug: Option<String>,
    ) {
        self.dispatch(&Notification::UserMessage {
            topic_id: topic_id.to_owned(),
            sender: sender.to_owned(),
            text: text.to_owned(),
            group_slug,
        });
    }
}
