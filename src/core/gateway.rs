//! Gateway orchestrator composing the session registry, prompt ingress,
//! stream broker, approval gate, notification fan-out, and history store.
//!
//! The registry and the broker never reference each other; composite
//! operations (end-session cleanup, prompt dispatch) live here.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::core::approvals::ApprovalGate;
use crate::core::broker::{StreamBroker, Subscription};
use crate::core::ingress::{next_message_id, prompt_channel, PromptReceiver, PromptSender};
use crate::core::notify::{Notifications, Notifier};
use crate::core::registry::SessionRegistry;
use crate::models::agent::AgentDescriptor;
use crate::models::approval::{ApprovalRequest, ApprovalResult};
use crate::models::chat::{ChatEntry, ChatRole};
use crate::models::prompt::Prompt;
use crate::models::session::Session;
use crate::models::stream::{StreamMessage, StreamSnapshot};
use crate::models::topic::TopicInfo;
use crate::persistence::{history_key, HistoryStore};
use crate::{AppError, Result};

/// Composition root of the gateway core.
pub struct Switchboard {
    registry: SessionRegistry,
    broker: StreamBroker,
    approvals: Arc<ApprovalGate>,
    notifications: Notifications,
    history: Arc<dyn HistoryStore>,
    prompts: PromptSender,
    catalog: Vec<AgentDescriptor>,
    session_idle: Duration,
}

impl Switchboard {
    /// Build the core from configuration, returning the orchestrator and
    /// the single consumer half of the prompt queue.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        history: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<Self>, PromptReceiver) {
        let notifications = Notifications::new(notifier);
        let broker = StreamBroker::new(
            config.stream.buffer_capacity,
            config.stream.subscriber_capacity,
            config.grace_window(),
        );
        let approvals = Arc::new(ApprovalGate::new(
            broker.clone(),
            notifications.clone(),
            config.approval_timeout(),
        ));
        let catalog: Vec<AgentDescriptor> =
            config.agents.iter().map(AgentDescriptor::from).collect();
        let registry =
            SessionRegistry::new(catalog.iter().map(|agent| agent.id.clone()).collect());
        let (prompts, receiver) = prompt_channel();

        let switchboard = Arc::new(Self {
            registry,
            broker,
            approvals,
            notifications,
            history,
            prompts,
            catalog,
            session_idle: Duration::from_secs(config.timeouts.session_idle_seconds),
        });
        (switchboard, receiver)
    }

    /// Configured agent descriptors.
    #[must_use]
    pub fn agents(&self) -> Vec<AgentDescriptor> {
        self.catalog.clone()
    }

    /// Whether an agent id is in the configured catalog.
    #[must_use]
    pub fn validate_agent(&self, agent_id: &str) -> bool {
        self.catalog.iter().any(|agent| agent.id == agent_id)
    }

    /// Session registry (C1).
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Stream broker (C3).
    #[must_use]
    pub fn broker(&self) -> &StreamBroker {
        &self.broker
    }

    /// Approval gate (C4).
    #[must_use]
    pub fn approvals(&self) -> &Arc<ApprovalGate> {
        &self.approvals
    }

    /// Typed notification helpers (C5).
    #[must_use]
    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// History store the gateway persists conversations through.
    #[must_use]
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Bind a topic to an agent/chat/thread triple.
    pub fn start_session(
        &self,
        topic_id: &str,
        agent_id: &str,
        chat_id: i64,
        thread_id: i64,
        group_slug: Option<String>,
    ) -> bool {
        self.registry
            .start_session(Session::new(topic_id, agent_id, chat_id, thread_id, group_slug))
    }

    /// End a topic's session: remove the registry binding, cancel its
    /// stream, and reject its pending approvals, in that order.
    pub fn end_session(&self, topic_id: &str) -> bool {
        let Some(session) = self.registry.remove(topic_id) else {
            return false;
        };
        self.broker.cancel_stream(topic_id);
        self.approvals.cancel_for_topic(topic_id);
        self.notifications
            .topic_changed(topic_id, &session.agent_id, session.group_slug);
        true
    }

    /// Enqueue a prompt and subscribe to the topic's response stream.
    ///
    /// The subscription is attached before the prompt is handed to the
    /// dispatch loop, so the caller cannot miss the first frame.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownSession` when the topic has no session.
    pub fn send_message(
        &self,
        topic_id: &str,
        text: &str,
        sender: &str,
        correlation_id: Option<String>,
        ct: CancellationToken,
    ) -> Result<Subscription> {
        let session = self.prepare_stream(topic_id, text, sender)?;
        let subscription = self
            .broker
            .subscribe(topic_id, ct)
            .ok_or_else(|| AppError::Hub(format!("stream for topic {topic_id} vanished")))?;
        self.dispatch_prompt(&session, topic_id, text, sender, correlation_id);
        Ok(subscription)
    }

    /// Fire-and-forget prompt enqueue.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownSession` when the topic has no session.
    pub fn enqueue_message(
        &self,
        topic_id: &str,
        text: &str,
        sender: &str,
        correlation_id: Option<String>,
    ) -> Result<bool> {
        let session = self.prepare_stream(topic_id, text, sender)?;
        self.dispatch_prompt(&session, topic_id, text, sender, correlation_id);
        Ok(true)
    }

    fn prepare_stream(&self, topic_id: &str, text: &str, sender: &str) -> Result<Session> {
        let session = self
            .registry
            .get(topic_id)
            .ok_or_else(|| AppError::UnknownSession(topic_id.to_owned()))?;

        let handle = self.broker.create_stream(topic_id, text, sender);
        if !handle.is_new {
            // Stream already in flight; the prompt still queues, ordering
            // against the running turn is the agent's concern.
            info!(topic_id, "prompt enqueued onto an active stream");
        }
        self.registry.touch(topic_id);
        Ok(session)
    }

    fn dispatch_prompt(
        &self,
        session: &Session,
        topic_id: &str,
        text: &str,
        sender: &str,
        correlation_id: Option<String>,
    ) {
        self.notifications
            .user_message(topic_id, sender, text, session.group_slug.clone());
        self.prompts.enqueue(Prompt {
            text: text.to_owned(),
            chat_id: session.chat_id,
            thread_id: session.thread_id,
            message_id: next_message_id(),
            sender: sender.to_owned(),
            correlation_id,
            agent_id: session.agent_id.clone(),
        });
    }

    /// Rebuild a reconnecting client's view: pending-approval prefix
    /// frames, then a live-tail subscription when a stream exists.
    #[must_use]
    pub fn resume_stream(
        &self,
        topic_id: &str,
        ct: CancellationToken,
    ) -> (Vec<StreamMessage>, Option<Subscription>) {
        let prefix = self
            .approvals
            .pending_for_topic(topic_id)
            .map(StreamMessage::approval)
            .into_iter()
            .collect();
        (prefix, self.broker.subscribe(topic_id, ct))
    }

    /// Atomic snapshot of a topic's stream state.
    #[must_use]
    pub fn stream_snapshot(&self, topic_id: &str) -> Option<StreamSnapshot> {
        self.broker.snapshot(topic_id)
    }

    /// Whether a topic currently has an in-flight stream.
    #[must_use]
    pub fn is_processing(&self, topic_id: &str) -> bool {
        self.broker.is_processing(topic_id)
    }

    /// Cancel a topic's in-flight stream.
    pub fn cancel_topic(&self, topic_id: &str) {
        let group_slug = self.registry.get(topic_id).and_then(|s| s.group_slug);
        self.broker.cancel_stream(topic_id);
        self.notifications.stream_changed(topic_id, false, group_slug);
    }

    /// Resolve a pending approval; `false` for unknown ids.
    pub fn respond_to_approval(&self, approval_id: &str, result: ApprovalResult) -> bool {
        self.approvals.respond(approval_id, result)
    }

    /// Whether an approval id is still awaiting resolution.
    #[must_use]
    pub fn is_approval_pending(&self, approval_id: &str) -> bool {
        self.approvals.is_pending(approval_id)
    }

    /// First unresolved approval request for a topic.
    #[must_use]
    pub fn pending_approval_for_topic(&self, topic_id: &str) -> Option<ApprovalRequest> {
        self.approvals.pending_for_topic(topic_id)
    }

    /// Conversation history filtered to user/assistant entries.
    ///
    /// Store failures degrade to an empty list.
    pub async fn get_history(
        &self,
        agent_id: &str,
        chat_id: i64,
        thread_id: i64,
    ) -> Vec<ChatEntry> {
        let key = history_key(agent_id, chat_id, thread_id);
        match self.history.get_messages(&key).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| matches!(entry.role, ChatRole::User | ChatRole::Assistant))
                .collect(),
            Err(err) => {
                warn!(%err, key, "history read failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Topic catalog for an agent, optionally filtered to one space.
    ///
    /// Store failures degrade to an empty list.
    pub async fn get_all_topics(
        &self,
        agent_id: &str,
        group_slug: Option<&str>,
    ) -> Vec<TopicInfo> {
        match self.history.get_all_topics(agent_id, group_slug).await {
            Ok(topics) => topics,
            Err(err) => {
                warn!(%err, agent_id, "topic catalog read failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Persist topic metadata and notify observers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn save_topic(&self, topic: &TopicInfo, is_new: bool) -> Result<()> {
        self.history.save_topic(topic).await?;
        info!(topic_id = %topic.topic_id, is_new, "topic saved");
        self.notifications
            .topic_changed(&topic.topic_id, &topic.agent_id, topic.group_slug.clone());
        Ok(())
    }

    /// End a topic's session and delete its persisted state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a persistence delete fails.
    pub async fn delete_topic(
        &self,
        agent_id: &str,
        topic_id: &str,
        chat_id: i64,
        thread_id: i64,
    ) -> Result<()> {
        let group_slug = self.registry.get(topic_id).and_then(|s| s.group_slug);
        let ended = self.end_session(topic_id);
        self.history
            .delete(&history_key(agent_id, chat_id, thread_id))
            .await?;
        self.history.delete_topic(agent_id, chat_id, topic_id).await?;
        // end_session already announced the change for a live session.
        if !ended {
            self.notifications.topic_changed(topic_id, agent_id, group_slug);
        }
        Ok(())
    }

    /// Spawn the idle-session sweep, or return `None` when disabled.
    ///
    /// Sessions with no activity for the configured window are ended
    /// through the full cleanup path.
    #[must_use]
    pub fn spawn_idle_sweep(self: Arc<Self>, ct: CancellationToken) -> Option<JoinHandle<()>> {
        if self.session_idle.is_zero() {
            return None;
        }
        let switchboard = self;
        let period = switchboard
            .session_idle
            .clamp(Duration::from_secs(1), Duration::from_secs(60));
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(period) => {}
                    () = ct.cancelled() => break,
                }
                for topic_id in switchboard.registry.idle_topics(switchboard.session_idle) {
                    info!(topic_id = %topic_id, "session idle timeout");
                    switchboard.end_session(&topic_id);
                }
            }
        }))
    }
}
