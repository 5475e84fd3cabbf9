//! Deterministic scripted runtime used by tests and demos.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::approval::ApprovalResult;
use crate::models::stream::{StreamMessage, ToolCall};
use crate::{AppError, Result};

use super::{AgentRuntime, TurnContext};

/// One step of a scripted turn.
pub enum ScriptedStep {
    /// Emit a content frame.
    Content(String),
    /// Emit a reasoning frame.
    Reasoning(String),
    /// Emit a tool-calls frame.
    ToolCalls(Vec<ToolCall>),
    /// Suspend on the approval gate for a tool-call batch, then emit the
    /// outcome as a content frame.
    RequestApproval(Vec<ToolCall>),
    /// Announce auto-approved calls.
    AutoApprove(Vec<ToolCall>),
    /// Sleep, cooperatively cancelled by the topic token.
    Pause(Duration),
    /// Fail the turn.
    Fail(String),
}

/// Runtime replaying a fixed step list, then replying with fixed text.
pub struct ScriptedAgent {
    steps: Vec<ScriptedStep>,
    reply: String,
}

impl ScriptedAgent {
    /// Create a scripted runtime.
    #[must_use]
    pub fn new(steps: Vec<ScriptedStep>, reply: impl Into<String>) -> Self {
        Self {
            steps,
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl AgentRuntime for ScriptedAgent {
    async fn run_turn(&self, turn: &TurnContext) -> Result<String> {
        for step in &self.steps {
            match step {
                ScriptedStep::Content(text) => {
                    turn.emitter.emit(StreamMessage::content(text.clone())).await;
                }
                ScriptedStep::Reasoning(text) => {
                    turn.emitter
                        .emit(StreamMessage::reasoning(text.clone()))
                        .await;
                }
                ScriptedStep::ToolCalls(calls) => {
                    turn.emitter
                        .emit(StreamMessage::tool_calls(calls.clone()))
                        .await;
                }
                ScriptedStep::RequestApproval(calls) => {
                    let outcome = turn.approvals.request(calls).await;
                    let text = match outcome {
                        ApprovalResult::Approved => "tool approved",
                        ApprovalResult::Rejected => "tool rejected",
                        ApprovalResult::AutoApproved => "tool auto-approved",
                    };
                    turn.emitter.emit(StreamMessage::content(text)).await;
                }
                ScriptedStep::AutoApprove(calls) => {
                    let _ = turn.approvals.auto_approved(calls).await;
                }
                ScriptedStep::Pause(duration) => {
                    tokio::select! {
                        () = tokio::time::sleep(*duration) => {}
                        () = turn.cancel.cancelled() => {
                            return Err(AppError::Agent("cancelled".into()));
                        }
                    }
                }
                ScriptedStep::Fail(message) => {
                    return Err(AppError::Agent(message.clone()));
                }
            }
        }
        Ok(self.reply.clone())
    }
}
