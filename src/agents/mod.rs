//! Agent runtime contract and the turn-scoped handles the dispatch loop
//! hands to a runtime: a frame emitter and an approval handle.
//!
//! The real model runtime is an external collaborator; this module only
//! fixes the seam. [`echo::EchoAgent`] backs the binaries and
//! [`scripted::ScriptedAgent`] drives deterministic tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::approvals::ApprovalGate;
use crate::core::broker::StreamBroker;
use crate::core::notify::Notifications;
use crate::models::approval::ApprovalResult;
use crate::models::chat::ChatEntry;
use crate::models::prompt::Prompt;
use crate::models::stream::{StreamMessage, ToolCall};
use crate::Result;

pub mod echo;
pub mod scripted;

/// One agent turn: consumes a prompt plus history, streams frames through
/// the emitter, and returns the final reply text.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run one turn. The dispatch loop writes the terminal frame from the
    /// returned reply; runtimes emit only intermediate frames.
    async fn run_turn(&self, turn: &TurnContext) -> Result<String>;
}

/// Everything a runtime needs for one turn.
pub struct TurnContext {
    /// The prompt being answered.
    pub prompt: Prompt,
    /// Conversation history (user/assistant entries, oldest first).
    pub history: Vec<ChatEntry>,
    /// Emitter for intermediate frames.
    pub emitter: TurnEmitter,
    /// Rendezvous handle for tool approvals.
    pub approvals: ApprovalHandle,
    /// Topic cancellation token; runtimes pass it into model calls.
    pub cancel: CancellationToken,
}

/// Writes a turn's frames into the owning topic stream under the
/// pending-write gate, so the terminal frame can never overtake an
/// in-flight emission.
pub struct TurnEmitter {
    broker: StreamBroker,
    notifications: Notifications,
    topic_id: String,
    group_slug: Option<String>,
    message_index: i64,
}

impl TurnEmitter {
    /// Create an emitter bound to one topic and reply message index.
    #[must_use]
    pub fn new(
        broker: StreamBroker,
        notifications: Notifications,
        topic_id: impl Into<String>,
        group_slug: Option<String>,
        message_index: i64,
    ) -> Self {
        Self {
            broker,
            notifications,
            topic_id: topic_id.into(),
            group_slug,
            message_index,
        }
    }

    /// Emit one frame. Writes after cancellation or completion are
    /// silently dropped by the broker.
    pub async fn emit(&self, msg: StreamMessage) {
        if !self.broker.try_increment_pending(&self.topic_id) {
            return;
        }
        if let Some(calls) = &msg.tool_calls {
            self.notifications
                .tool_calls(&self.topic_id, calls.clone(), self.group_slug.clone());
        }
        self.broker
            .write_message(&self.topic_id, msg.at_index(self.message_index))
            .await;
        if self.broker.decrement_pending_and_check(&self.topic_id) {
            self.broker.complete_stream(&self.topic_id);
        }
    }
}

/// Turn-scoped view of the approval gate.
pub struct ApprovalHandle {
    gate: Arc<ApprovalGate>,
    topic_id: String,
    group_slug: Option<String>,
    message_index: i64,
    cancel: CancellationToken,
}

impl ApprovalHandle {
    /// Create a handle bound to one topic and turn.
    #[must_use]
    pub fn new(
        gate: Arc<ApprovalGate>,
        topic_id: impl Into<String>,
        group_slug: Option<String>,
        message_index: i64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gate,
            topic_id: topic_id.into(),
            group_slug,
            message_index,
            cancel,
        }
    }

    /// Suspend until the user decides on the tool-call batch.
    pub async fn request(&self, calls: &[ToolCall]) -> ApprovalResult {
        self.gate
            .request_approval(
                &self.topic_id,
                self.group_slug.clone(),
                calls,
                self.message_index,
                &self.cancel,
            )
            .await
    }

    /// Announce auto-approved calls without suspending.
    pub async fn auto_approved(&self, calls: &[ToolCall]) -> ApprovalResult {
        self.gate
            .notify_auto_approved(&self.topic_id, calls, self.message_index)
            .await
    }
}
