//! Outbound hub frames, one JSON object per WebSocket text frame.

use serde::{Deserialize, Serialize};

use crate::models::stream::StreamMessage;

/// A server frame, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerResponse {
    /// Terminal result of a non-streaming request.
    Result {
        /// Echo of the request id.
        id: String,
        /// Method-specific payload.
        data: serde_json::Value,
    },
    /// One frame of a streaming request.
    StreamFrame {
        /// Echo of the request id.
        id: String,
        /// The stream frame.
        frame: StreamMessage,
    },
    /// End of a streaming request.
    StreamEnd {
        /// Echo of the request id.
        id: String,
    },
    /// Request-level failure.
    Error {
        /// Echo of the request id, when it could be parsed.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Failure description.
        error: String,
    },
    /// Pushed notification, not correlated to a request.
    Notification {
        /// Notification method name.
        method: String,
        /// Notification payload.
        payload: serde_json::Value,
    },
}
