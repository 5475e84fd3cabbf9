//! Approval request and result models for the tool-approval rendezvous.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stream::ToolCall;

/// Length of the short hex approval identifier.
const APPROVAL_ID_LEN: usize = 8;

/// Generate a short random approval identifier (8 lowercase hex chars).
#[must_use]
pub fn new_approval_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(APPROVAL_ID_LEN)
        .collect()
}

/// Terminal outcome of an approval rendezvous.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalResult {
    /// User granted the tool call.
    Approved,
    /// User denied the tool call, or the request timed out / was cancelled.
    Rejected,
    /// Policy allowed the call without asking the user.
    AutoApproved,
}

/// A tool call awaiting a user decision, as shown to transports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalRequest {
    /// Short random identifier correlating frames with responses.
    pub approval_id: String,
    /// Name of the tool the agent wants to run.
    pub tool_name: String,
    /// Tool arguments as a JSON object.
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ApprovalRequest {
    /// Build a request for one tool call under an existing approval id.
    ///
    /// A turn's tool-call batch shares a single id; each call gets its own
    /// request frame carrying that id.
    #[must_use]
    pub fn for_call(approval_id: impl Into<String>, call: &ToolCall) -> Self {
        Self {
            approval_id: approval_id.into(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
        }
    }
}
