//! Trivial echo runtime backing the binaries where no model runtime is
//! wired in.

use async_trait::async_trait;

use crate::models::stream::StreamMessage;
use crate::Result;

use super::{AgentRuntime, TurnContext};

/// Streams one reasoning frame, then replies with the prompt echoed back.
pub struct EchoAgent;

#[async_trait]
impl AgentRuntime for EchoAgent {
    async fn run_turn(&self, turn: &TurnContext) -> Result<String> {
        turn.emitter
            .emit(StreamMessage::reasoning(format!(
                "Echoing a {}-character prompt.",
                turn.prompt.text.len()
            )))
            .await;
        Ok(format!("You said: {}", turn.prompt.text))
    }
}
