//! Tool-approval rendezvous: suspends an agent mid-turn until a user
//! decision arrives, the caller is cancelled, or the timeout elapses.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::broker::StreamBroker;
use crate::core::notify::Notifications;
use crate::models::approval::{new_approval_id, ApprovalRequest, ApprovalResult};
use crate::models::stream::{StreamMessage, ToolCall};

struct PendingApproval {
    topic_id: String,
    group_slug: Option<String>,
    requests: Vec<ApprovalRequest>,
    tx: Option<oneshot::Sender<ApprovalResult>>,
}

/// Rendezvous between agent-side waiters and transport-side responders,
/// keyed by approval id.
pub struct ApprovalGate {
    pending: Mutex<HashMap<String, PendingApproval>>,
    broker: StreamBroker,
    notifications: Notifications,
    timeout: Duration,
}

impl ApprovalGate {
    /// Create a gate writing request frames through `broker` and
    /// resolving after at most `timeout` without a user decision.
    #[must_use]
    pub fn new(broker: StreamBroker, notifications: Notifications, timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            broker,
            notifications,
            timeout,
        }
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, PendingApproval>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Write one frame under the pending-write gate, like any other
    /// turn emission. A concurrent terminal frame on the same topic must
    /// not complete the stream while this write is in flight.
    async fn write_frame(&self, topic_id: &str, msg: StreamMessage) {
        if !self.broker.try_increment_pending(topic_id) {
            return;
        }
        self.broker.write_message(topic_id, msg).await;
        if self.broker.decrement_pending_and_check(topic_id) {
            self.broker.complete_stream(topic_id);
        }
    }

    /// Suspend until the user decides on a turn's tool-call batch.
    ///
    /// Registers one approval id for the batch, writes a request frame per
    /// call into the topic's stream, then waits. Resolves `Rejected` when
    /// `ct` fires or the timeout elapses (the timeout additionally writes a
    /// user-visible frame). The pending entry is removed on every exit
    /// path.
    pub async fn request_approval(
        &self,
        topic_id: &str,
        group_slug: Option<String>,
        calls: &[ToolCall],
        message_index: i64,
        ct: &CancellationToken,
    ) -> ApprovalResult {
        let approval_id = new_approval_id();
        let requests: Vec<ApprovalRequest> = calls
            .iter()
            .map(|call| ApprovalRequest::for_call(approval_id.as_str(), call))
            .collect();

        let (tx, rx) = oneshot::channel();
        self.locked().insert(
            approval_id.clone(),
            PendingApproval {
                topic_id: topic_id.to_owned(),
                group_slug: group_slug.clone(),
                requests: requests.clone(),
                tx: Some(tx),
            },
        );

        for request in &requests {
            self.write_frame(
                topic_id,
                StreamMessage::approval(request.clone()).at_index(message_index),
            )
            .await;
        }
        info!(
            approval_id = %approval_id,
            topic_id,
            tools = calls.len(),
            "approval requested"
        );

        let result = tokio::select! {
            decision = rx => decision.unwrap_or(ApprovalResult::Rejected),
            () = ct.cancelled() => ApprovalResult::Rejected,
            () = tokio::time::sleep(self.timeout) => {
                warn!(approval_id = %approval_id, topic_id, "approval request timed out");
                self.write_frame(
                    topic_id,
                    StreamMessage::user_message(format!(
                        "Approval request timed out after {} seconds",
                        self.timeout.as_secs()
                    ))
                    .at_index(message_index),
                )
                .await;
                self.notifications.approval_resolved(
                    &approval_id,
                    topic_id,
                    ApprovalResult::Rejected,
                    group_slug.clone(),
                );
                ApprovalResult::Rejected
            }
        };

        self.locked().remove(&approval_id);
        result
    }

    /// Resolve a pending approval.
    ///
    /// The first resolution wins and wakes the waiter; later calls for an
    /// entry still in flight are idempotent and return `true`. Returns
    /// `false` when the id is expired or never existed.
    pub fn respond(&self, approval_id: &str, result: ApprovalResult) -> bool {
        let resolved = {
            let mut pending = self.locked();
            let Some(entry) = pending.get_mut(approval_id) else {
                return false;
            };
            entry
                .tx
                .take()
                .map(|tx| (entry.topic_id.clone(), entry.group_slug.clone(), tx))
        };

        if let Some((topic_id, group_slug, tx)) = resolved {
            // Waiter may have left between lookup and send; cleanup is its job.
            let _ = tx.send(result);
            info!(approval_id, topic_id = %topic_id, ?result, "approval resolved");
            self.notifications
                .approval_resolved(approval_id, &topic_id, result, group_slug);
        }
        true
    }

    /// Whether an approval id is still awaiting resolution.
    #[must_use]
    pub fn is_pending(&self, approval_id: &str) -> bool {
        self.locked()
            .get(approval_id)
            .is_some_and(|entry| entry.tx.is_some())
    }

    /// First unresolved request for a topic, used by reconnecting clients
    /// to rebuild their approval UI.
    #[must_use]
    pub fn pending_for_topic(&self, topic_id: &str) -> Option<ApprovalRequest> {
        self.locked()
            .values()
            .find(|entry| entry.topic_id == topic_id && entry.tx.is_some())
            .and_then(|entry| entry.requests.first().cloned())
    }

    /// Resolve every pending approval for a topic with `Rejected`.
    ///
    /// Used by end-of-session cleanup; waiters wake immediately.
    pub fn cancel_for_topic(&self, topic_id: &str) {
        let drained: Vec<PendingApproval> = {
            let mut pending = self.locked();
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, entry)| entry.topic_id == topic_id)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id))
                .collect()
        };

        for entry in drained {
            if let Some(tx) = entry.tx {
                let _ = tx.send(ApprovalResult::Rejected);
            }
        }
    }

    /// Announce auto-approved tool calls without registering a rendezvous.
    ///
    /// Writes an informational frame into the topic's stream and returns
    /// immediately.
    pub async fn notify_auto_approved(
        &self,
        topic_id: &str,
        calls: &[ToolCall],
        message_index: i64,
    ) -> ApprovalResult {
        self.write_frame(
            topic_id,
            StreamMessage::tool_calls(calls.to_vec()).at_index(message_index),
        )
        .await;
        ApprovalResult::AutoApproved
    }
}
