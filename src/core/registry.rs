//! Session registry: topic → session binding with a chat-id reverse index.
//!
//! Both indexes live behind one lock so they can never disagree; every
//! operation is a short critical section over the maps.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::models::session::Session;

struct Indexes {
    by_topic: HashMap<String, Session>,
    topic_by_chat: HashMap<i64, String>,
    last_activity: HashMap<String, Instant>,
}

/// Thread-safe registry of active sessions.
pub struct SessionRegistry {
    known_agents: Vec<String>,
    inner: Mutex<Indexes>,
}

impl SessionRegistry {
    /// Create a registry accepting sessions for the given agent ids.
    #[must_use]
    pub fn new(known_agents: Vec<String>) -> Self {
        Self {
            known_agents,
            inner: Mutex::new(Indexes {
                by_topic: HashMap::new(),
                topic_by_chat: HashMap::new(),
                last_activity: HashMap::new(),
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Indexes> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Bind a topic to an agent/chat/thread triple.
    ///
    /// Returns `false` only when the agent id is not in the configured
    /// catalog. Re-inserting an identical session is a no-op; re-binding a
    /// topic to a different chat atomically drops the stale reverse entry.
    pub fn start_session(&self, session: Session) -> bool {
        if !self.known_agents.iter().any(|id| *id == session.agent_id) {
            warn!(
                topic_id = %session.topic_id,
                agent_id = %session.agent_id,
                "rejected session for unknown agent"
            );
            return false;
        }

        let mut inner = self.locked();
        if let Some(existing) = inner.by_topic.get(&session.topic_id) {
            if *existing == session {
                return true;
            }
            let stale_chat = existing.chat_id;
            inner.topic_by_chat.remove(&stale_chat);
        }
        // A chat can back at most one topic; rebinding it evicts the old
        // topic so the two indexes stay in one-to-one correspondence.
        if let Some(stale_topic) = inner.topic_by_chat.get(&session.chat_id).cloned() {
            if stale_topic != session.topic_id {
                inner.by_topic.remove(&stale_topic);
                inner.last_activity.remove(&stale_topic);
            }
        }
        info!(
            topic_id = %session.topic_id,
            agent_id = %session.agent_id,
            chat_id = session.chat_id,
            "session started"
        );
        inner
            .topic_by_chat
            .insert(session.chat_id, session.topic_id.clone());
        inner
            .last_activity
            .insert(session.topic_id.clone(), Instant::now());
        inner.by_topic.insert(session.topic_id.clone(), session);
        true
    }

    /// Look up the session bound to a topic.
    #[must_use]
    pub fn get(&self, topic_id: &str) -> Option<Session> {
        self.locked().by_topic.get(topic_id).cloned()
    }

    /// Reverse lookup: topic bound to a chat id.
    #[must_use]
    pub fn topic_by_chat(&self, chat_id: i64) -> Option<String> {
        self.locked().topic_by_chat.get(&chat_id).cloned()
    }

    /// Remove a topic's session, dropping both index entries.
    ///
    /// Returns the removed session, or `None` when the topic was unbound.
    pub fn remove(&self, topic_id: &str) -> Option<Session> {
        let mut inner = self.locked();
        let session = inner.by_topic.remove(topic_id)?;
        inner.topic_by_chat.remove(&session.chat_id);
        inner.last_activity.remove(topic_id);
        info!(topic_id, "session ended");
        Some(session)
    }

    /// Record activity on a topic, deferring its idle expiry.
    pub fn touch(&self, topic_id: &str) {
        let mut inner = self.locked();
        if inner.by_topic.contains_key(topic_id) {
            inner.last_activity.insert(topic_id.to_owned(), Instant::now());
        }
    }

    /// Topics whose last activity is older than `max_idle`.
    #[must_use]
    pub fn idle_topics(&self, max_idle: Duration) -> Vec<String> {
        let now = Instant::now();
        self.locked()
            .last_activity
            .iter()
            .filter(|(_, last)| now.duration_since(**last) > max_idle)
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locked().by_topic.len()
    }

    /// Whether the registry holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked().by_topic.is_empty()
    }
}
