//! Agent dispatch loop: the single consumer of the prompt queue.
//!
//! Each prompt becomes one agent turn running in its own task, so a slow
//! topic never blocks the others while the queue itself stays
//! consumed-at-most-once.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agents::{AgentRuntime, ApprovalHandle, TurnContext, TurnEmitter};
use crate::core::gateway::Switchboard;
use crate::core::ingress::{next_message_id, PromptReceiver};
use crate::models::chat::{ChatEntry, ChatRole};
use crate::models::prompt::Prompt;
use crate::models::stream::StreamMessage;
use crate::persistence::history_key;

/// Dispatch loop wiring prompts to agent turns.
pub struct AgentWorker {
    switchboard: Arc<Switchboard>,
    runtime: Arc<dyn AgentRuntime>,
}

impl AgentWorker {
    /// Create a worker over the gateway core and an agent runtime.
    #[must_use]
    pub fn new(switchboard: Arc<Switchboard>, runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            switchboard,
            runtime,
        }
    }

    /// Spawn the dispatch loop onto the runtime.
    #[must_use]
    pub fn spawn(self, prompts: PromptReceiver, ct: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(prompts, ct))
    }

    /// Consume prompts until `ct` fires or every sender is dropped.
    pub async fn run(self, mut prompts: PromptReceiver, ct: CancellationToken) {
        while let Some(prompt) = prompts.recv(&ct).await {
            let switchboard = Arc::clone(&self.switchboard);
            let runtime = Arc::clone(&self.runtime);
            tokio::spawn(async move {
                run_turn(switchboard, runtime, prompt).await;
            });
        }
        info!("agent dispatch loop stopped");
    }
}

/// Run one agent turn for a prompt.
async fn run_turn(switchboard: Arc<Switchboard>, runtime: Arc<dyn AgentRuntime>, prompt: Prompt) {
    let Some(topic_id) = switchboard.registry().topic_by_chat(prompt.chat_id) else {
        warn!(chat_id = prompt.chat_id, "prompt for unbound chat dropped");
        return;
    };
    let Some(session) = switchboard.registry().get(&topic_id) else {
        warn!(topic_id = %topic_id, "session vanished before dispatch");
        return;
    };

    let broker = switchboard.broker().clone();
    let handle = broker.create_stream(&topic_id, &prompt.text, &prompt.sender);
    switchboard
        .notifications()
        .stream_changed(&topic_id, true, session.group_slug.clone());

    // Reply message index is allocated up front so every frame of the turn
    // carries it.
    let reply_id = next_message_id();
    let emitter = TurnEmitter::new(
        broker.clone(),
        switchboard.notifications().clone(),
        topic_id.clone(),
        session.group_slug.clone(),
        reply_id,
    );
    let approvals = ApprovalHandle::new(
        Arc::clone(switchboard.approvals()),
        topic_id.clone(),
        session.group_slug.clone(),
        reply_id,
        handle.cancel.clone(),
    );
    let history = switchboard
        .get_history(&prompt.agent_id, prompt.chat_id, prompt.thread_id)
        .await;

    let turn = TurnContext {
        prompt: prompt.clone(),
        history,
        emitter,
        approvals,
        cancel: handle.cancel.clone(),
    };

    match runtime.run_turn(&turn).await {
        Ok(reply) => {
            let key = history_key(&prompt.agent_id, prompt.chat_id, prompt.thread_id);
            let entries = [
                ChatEntry::new(
                    prompt.message_id,
                    ChatRole::User,
                    prompt.text.as_str(),
                    prompt.sender.as_str(),
                ),
                ChatEntry::new(
                    reply_id,
                    ChatRole::Assistant,
                    reply.as_str(),
                    prompt.agent_id.as_str(),
                ),
            ];
            // Persist before the terminal frame; a failed write surfaces
            // to the user instead of the reply.
            match switchboard.history().add_messages(&key, &entries).await {
                Ok(()) => {
                    turn.emitter
                        .emit(StreamMessage::content(reply).complete())
                        .await;
                    switchboard.notifications().new_message(
                        &topic_id,
                        prompt.chat_id,
                        reply_id,
                        session.group_slug.clone(),
                    );
                }
                Err(err) => {
                    error!(%err, key, "turn persistence failed");
                    turn.emitter
                        .emit(StreamMessage::error(format!(
                            "failed to persist turn: {err}"
                        )))
                        .await;
                }
            }
        }
        Err(err) => {
            if handle.cancel.is_cancelled() {
                debug!(topic_id = %topic_id, "turn ended by cancellation");
                turn.emitter.emit(StreamMessage::error("cancelled")).await;
            } else {
                warn!(topic_id = %topic_id, %err, "agent turn failed");
                turn.emitter.emit(StreamMessage::error(err.to_string())).await;
            }
        }
    }

    switchboard
        .notifications()
        .stream_changed(&topic_id, false, session.group_slug);
    switchboard.registry().touch(&topic_id);
}
