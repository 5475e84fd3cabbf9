//! Stream frame and snapshot models for the per-topic response stream.

use serde::{Deserialize, Serialize};

use super::approval::ApprovalRequest;

/// A tool invocation the agent wants to perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ToolCall {
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    /// Construct a tool call from a name and JSON arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// One frame of a topic's response stream.
///
/// Exactly the populated optional fields carry meaning; `sequence_number`
/// is assigned by the broker at write time and orders frames within a
/// topic. The frame with `is_complete` set ends the stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StreamMessage {
    /// Assistant-visible response text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Model reasoning, rendered only when the client asks for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Tool calls announced by the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// A tool call awaiting user approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request: Option<ApprovalRequest>,
    /// Echo of a user-visible status or user message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    /// Terminal error description when the turn failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Index of the underlying chat message this frame belongs to.
    pub message_index: i64,
    /// Per-topic monotone order, assigned at write time.
    pub sequence_number: u64,
    /// Marks the final frame of the stream.
    pub is_complete: bool,
}

impl StreamMessage {
    /// Frame carrying response text.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    /// Frame carrying model reasoning.
    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            ..Self::default()
        }
    }

    /// Frame announcing tool calls.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::default()
        }
    }

    /// Frame carrying a pending approval request.
    #[must_use]
    pub fn approval(request: ApprovalRequest) -> Self {
        Self {
            approval_request: Some(request),
            ..Self::default()
        }
    }

    /// Frame echoing a user message or user-visible status line.
    #[must_use]
    pub fn user_message(text: impl Into<String>) -> Self {
        Self {
            user_message: Some(text.into()),
            ..Self::default()
        }
    }

    /// Terminal error frame.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            error: Some(text.into()),
            is_complete: true,
            ..Self::default()
        }
    }

    /// Mark this frame as the final one of the stream.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.is_complete = true;
        self
    }

    /// Attach the chat message index this frame belongs to.
    #[must_use]
    pub fn at_index(mut self, message_index: i64) -> Self {
        self.message_index = message_index;
        self
    }
}

/// Atomic snapshot of a topic's stream state, used for resumption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StreamSnapshot {
    /// Whether an agent turn is still producing frames.
    pub is_processing: bool,
    /// Retained replay buffer, oldest first.
    pub buffered_messages: Vec<StreamMessage>,
    /// Highest message index observed.
    pub last_index: i64,
    /// Highest sequence number ever assigned — not the oldest retained,
    /// so clients can detect gaps they missed.
    pub last_sequence: u64,
}
