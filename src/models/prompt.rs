//! Prompt record flowing from transports to the agent dispatch loop.

use serde::{Deserialize, Serialize};

/// A single user prompt, consumed exactly once by the agent worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Prompt {
    /// Raw prompt text.
    pub text: String,
    /// Chat the prompt belongs to.
    pub chat_id: i64,
    /// Thread within the chat; 0 when absent.
    pub thread_id: i64,
    /// Process-wide monotone message counter value.
    pub message_id: i64,
    /// Display name of the sender.
    pub sender: String,
    /// Transport-supplied correlation id echoed back in responses.
    pub correlation_id: Option<String>,
    /// Agent the owning session dispatches to, copied at enqueue time.
    pub agent_id: String,
}
