//! Per-topic stream broker: replay buffer, multi-subscriber fan-out,
//! pending-write gating, and deterministic teardown.
//!
//! One [`TopicState`] exists per topic with an in-progress response. The
//! topic map is guarded by a single short-lived lock; subscriber queues
//! are per-subscriber bounded channels, so a slow consumer never
//! back-pressures the writer. Completed state lingers for a grace window
//! so a client subscribing just after completion can still fetch the
//! final buffer.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::stream::{StreamMessage, StreamSnapshot};

/// Retry attempts when a completion frame meets a full subscriber queue.
const COMPLETE_ENQUEUE_ATTEMPTS: u32 = 20;
/// Delay between completion-frame retry attempts.
const COMPLETE_ENQUEUE_BACKOFF: Duration = Duration::from_millis(5);

/// Handle to a topic's stream, returned by [`StreamBroker::create_stream`].
#[derive(Debug, Clone)]
pub struct StreamHandle {
    /// Owning topic.
    pub topic_id: String,
    /// Token cancelled when the stream is cancelled or the session ends.
    pub cancel: CancellationToken,
    /// Whether this call created the stream (`false`: a stream was
    /// already in flight for the topic).
    pub is_new: bool,
}

struct TopicState {
    buffer: VecDeque<StreamMessage>,
    pending_writes: u32,
    is_processing: bool,
    completed: bool,
    sequence: u64,
    last_index: i64,
    next_subscriber_id: u64,
    subscribers: HashMap<u64, mpsc::Sender<StreamMessage>>,
    cancel: CancellationToken,
    epoch: u64,
}

struct BrokerInner {
    topics: Mutex<HashMap<String, TopicState>>,
    buffer_capacity: usize,
    subscriber_capacity: usize,
    grace: Duration,
    epochs: AtomicU64,
}

/// Broker owning every topic's stream state. Cheap to clone; clones share
/// the same state.
#[derive(Clone)]
pub struct StreamBroker {
    inner: Arc<BrokerInner>,
}

impl StreamBroker {
    /// Create a broker with the given buffer/subscriber capacities and
    /// post-completion grace window.
    #[must_use]
    pub fn new(buffer_capacity: usize, subscriber_capacity: usize, grace: Duration) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: Mutex::new(HashMap::new()),
                buffer_capacity,
                subscriber_capacity,
                grace,
                epochs: AtomicU64::new(0),
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, TopicState>> {
        match self.inner.topics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Create (or join) the stream for a topic.
    ///
    /// A topic with an in-flight stream returns the existing handle with
    /// `is_new == false`; completed-but-lingering state is replaced by a
    /// fresh stream.
    pub fn create_stream(&self, topic_id: &str, prompt: &str, sender: &str) -> StreamHandle {
        let mut topics = self.locked();
        if let Some(state) = topics.get(topic_id) {
            if state.is_processing {
                return StreamHandle {
                    topic_id: topic_id.to_owned(),
                    cancel: state.cancel.clone(),
                    is_new: false,
                };
            }
        }

        let cancel = CancellationToken::new();
        let epoch = self.inner.epochs.fetch_add(1, Ordering::Relaxed) + 1;
        topics.insert(
            topic_id.to_owned(),
            TopicState {
                buffer: VecDeque::with_capacity(self.inner.buffer_capacity),
                pending_writes: 0,
                is_processing: true,
                completed: false,
                sequence: 0,
                last_index: 0,
                next_subscriber_id: 0,
                subscribers: HashMap::new(),
                cancel: cancel.clone(),
                epoch,
            },
        );
        info!(
            topic_id,
            sender,
            prompt_len = prompt.len(),
            "stream created"
        );
        StreamHandle {
            topic_id: topic_id.to_owned(),
            cancel,
            is_new: true,
        }
    }

    /// Subscribe to frames written from now onward.
    ///
    /// Returns `None` when the topic has no stream state at all. A stream
    /// that already completed yields an ended subscription: zero live
    /// frames, but [`StreamBroker::snapshot`] still serves the buffer.
    pub fn subscribe(&self, topic_id: &str, ct: CancellationToken) -> Option<Subscription> {
        let mut topics = self.locked();
        let state = topics.get_mut(topic_id)?;

        if !state.is_processing {
            let (_tx, rx) = mpsc::channel(1);
            return Some(Subscription {
                broker: self.clone(),
                topic_id: topic_id.to_owned(),
                id: 0,
                registered: false,
                rx,
                caller: ct,
                topic_cancel: state.cancel.clone(),
            });
        }

        let (tx, rx) = mpsc::channel(self.inner.subscriber_capacity);
        state.next_subscriber_id += 1;
        let id = state.next_subscriber_id;
        state.subscribers.insert(id, tx);
        debug!(topic_id, subscriber = id, "subscriber attached");
        Some(Subscription {
            broker: self.clone(),
            topic_id: topic_id.to_owned(),
            id,
            registered: true,
            rx,
            caller: ct,
            topic_cancel: state.cancel.clone(),
        })
    }

    /// Atomic snapshot of a topic's stream state.
    #[must_use]
    pub fn snapshot(&self, topic_id: &str) -> Option<StreamSnapshot> {
        let topics = self.locked();
        let state = topics.get(topic_id)?;
        Some(StreamSnapshot {
            is_processing: state.is_processing,
            buffered_messages: state.buffer.iter().cloned().collect(),
            last_index: state.last_index,
            last_sequence: state.sequence,
        })
    }

    /// Whether a topic currently has an in-flight stream.
    #[must_use]
    pub fn is_processing(&self, topic_id: &str) -> bool {
        self.locked()
            .get(topic_id)
            .is_some_and(|state| state.is_processing)
    }

    /// Write a frame into a topic's stream.
    ///
    /// Assigns the sequence number, appends to the replay buffer (evicting
    /// the oldest frame at capacity), and fans out to every subscriber
    /// without blocking: a full subscriber queue drops the frame for that
    /// subscriber only. Completion frames retry briefly so subscribers do
    /// not miss the terminal frame over transient contention. A write
    /// after cancellation or completion is a silent no-op.
    pub async fn write_message(&self, topic_id: &str, mut msg: StreamMessage) {
        let is_complete = msg.is_complete;
        let targets = {
            let mut topics = self.locked();
            let Some(state) = topics.get_mut(topic_id) else {
                return;
            };
            if state.cancel.is_cancelled() || !state.is_processing {
                return;
            }
            state.sequence += 1;
            msg.sequence_number = state.sequence;
            if msg.message_index > state.last_index {
                state.last_index = msg.message_index;
            }
            if state.buffer.len() == self.inner.buffer_capacity {
                state.buffer.pop_front();
            }
            state.buffer.push_back(msg.clone());
            if is_complete {
                state.completed = true;
            }
            state
                .subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect::<Vec<_>>()
        };

        let mut gone = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(msg.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(frame)) => {
                    if is_complete {
                        if !enqueue_with_backoff(&tx, frame).await {
                            warn!(
                                topic_id,
                                subscriber = id,
                                "subscriber stuck, completion frame dropped"
                            );
                        }
                    } else {
                        debug!(topic_id, subscriber = id, "subscriber queue full, frame dropped");
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(id),
            }
        }
        if !gone.is_empty() {
            let mut topics = self.locked();
            if let Some(state) = topics.get_mut(topic_id) {
                for id in gone {
                    state.subscribers.remove(&id);
                }
            }
        }

        if is_complete {
            self.complete_stream(topic_id);
        }
    }

    /// Reserve a pending write slot before an asynchronous emission.
    ///
    /// Returns `false` when the topic has no in-flight stream.
    pub fn try_increment_pending(&self, topic_id: &str) -> bool {
        let mut topics = self.locked();
        let Some(state) = topics.get_mut(topic_id) else {
            return false;
        };
        if !state.is_processing || state.cancel.is_cancelled() {
            return false;
        }
        state.pending_writes += 1;
        true
    }

    /// Release a pending write slot.
    ///
    /// Returns `true` iff the counter hit zero and a terminal frame has
    /// been written; the caller then calls [`StreamBroker::complete_stream`].
    pub fn decrement_pending_and_check(&self, topic_id: &str) -> bool {
        let mut topics = self.locked();
        let Some(state) = topics.get_mut(topic_id) else {
            return false;
        };
        state.pending_writes = state.pending_writes.saturating_sub(1);
        state.pending_writes == 0 && state.completed
    }

    /// Transition a topic to the completing state once drained.
    ///
    /// No-op until a terminal frame has been written and every pending
    /// write has been released. Closes subscriber queues (consumers see
    /// end-of-stream) and schedules state removal after the grace window,
    /// unless a newer stream reclaims the topic first. Idempotent.
    pub fn complete_stream(&self, topic_id: &str) {
        let epoch = {
            let mut topics = self.locked();
            let Some(state) = topics.get_mut(topic_id) else {
                return;
            };
            if !state.is_processing || !state.completed || state.pending_writes > 0 {
                return;
            }
            state.is_processing = false;
            state.subscribers.clear();
            state.epoch
        };
        info!(topic_id, "stream completed");

        let broker = self.clone();
        let topic = topic_id.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(broker.inner.grace).await;
            broker.remove_if_stale(&topic, epoch);
        });
    }

    /// Cancel a topic's stream: fire its token, close subscriber queues,
    /// and remove state immediately.
    pub fn cancel_stream(&self, topic_id: &str) {
        let removed = self.locked().remove(topic_id);
        if let Some(state) = removed {
            state.cancel.cancel();
            info!(topic_id, "stream cancelled");
        }
    }

    fn remove_if_stale(&self, topic_id: &str, epoch: u64) {
        let mut topics = self.locked();
        let stale = topics
            .get(topic_id)
            .is_some_and(|state| state.epoch == epoch && !state.is_processing);
        if stale {
            topics.remove(topic_id);
            debug!(topic_id, "stream state removed after grace window");
        }
    }

    fn unsubscribe(&self, topic_id: &str, id: u64) {
        let mut topics = self.locked();
        if let Some(state) = topics.get_mut(topic_id) {
            state.subscribers.remove(&id);
            debug!(topic_id, subscriber = id, "subscriber detached");
        }
    }
}

/// Enqueue a completion frame with a bounded retry against transient
/// queue contention. Returns whether the frame was delivered.
async fn enqueue_with_backoff(tx: &mpsc::Sender<StreamMessage>, mut frame: StreamMessage) -> bool {
    for _ in 0..COMPLETE_ENQUEUE_ATTEMPTS {
        tokio::time::sleep(COMPLETE_ENQUEUE_BACKOFF).await;
        match tx.try_send(frame) {
            Ok(()) => return true,
            Err(mpsc::error::TrySendError::Full(f)) => frame = f,
            // Subscriber went away; nothing left to deliver.
            Err(mpsc::error::TrySendError::Closed(_)) => return true,
        }
    }
    false
}

/// Live tail of one topic's stream, held by a single subscriber.
///
/// Ends when the stream completes, the stream is cancelled, or the
/// caller's token fires; dropping it detaches the subscriber queue.
pub struct Subscription {
    broker: StreamBroker,
    topic_id: String,
    id: u64,
    registered: bool,
    rx: mpsc::Receiver<StreamMessage>,
    caller: CancellationToken,
    topic_cancel: CancellationToken,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic_id", &self.topic_id)
            .field("id", &self.id)
            .field("registered", &self.registered)
            .finish()
    }
}

impl Subscription {
    /// Next live frame, or `None` at end-of-stream/cancellation.
    pub async fn next(&mut self) -> Option<StreamMessage> {
        tokio::select! {
            frame = self.rx.recv() => frame,
            () = self.caller.cancelled() => None,
            () = self.topic_cancel.cancelled() => None,
        }
    }

    /// Topic this subscription listens on.
    #[must_use]
    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registered {
            self.broker.unsubscribe(&self.topic_id, self.id);
        }
    }
}
