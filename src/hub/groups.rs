//! Connection registry with group membership, and the [`Notifier`]
//! implementation delivering through it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::notify::Notifier;

use super::responses::ServerResponse;

struct ConnectionEntry {
    tx: mpsc::UnboundedSender<ServerResponse>,
    group_slug: Option<String>,
}

/// All live hub connections, each with its outbound queue and current
/// group membership. A connection belongs to at most one group.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<Uuid, ConnectionEntry>>,
}

impl ConnectionRegistry {
    fn locked(&self) -> MutexGuard<'_, HashMap<Uuid, ConnectionEntry>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a connection's outbound queue.
    pub fn register(&self, id: Uuid, tx: mpsc::UnboundedSender<ServerResponse>) {
        self.locked().insert(
            id,
            ConnectionEntry {
                tx,
                group_slug: None,
            },
        );
    }

    /// Drop a connection.
    pub fn unregister(&self, id: Uuid) {
        self.locked().remove(&id);
    }

    /// Move a connection between groups atomically.
    pub fn set_group(&self, id: Uuid, group_slug: Option<String>) {
        if let Some(entry) = self.locked().get_mut(&id) {
            entry.group_slug = group_slug;
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    /// Whether no connections are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    fn deliver(&self, frame: &ServerResponse, group_slug: Option<&str>) {
        let connections = self.locked();
        for entry in connections.values() {
            let in_scope = match group_slug {
                Some(group) => entry.group_slug.as_deref() == Some(group),
                None => true,
            };
            if in_scope {
                // A closed queue means the connection is tearing down.
                let _ = entry.tx.send(frame.clone());
            }
        }
    }
}

/// [`Notifier`] delivering through the hub's connection registry.
pub struct HubNotifier {
    connections: Arc<ConnectionRegistry>,
}

impl HubNotifier {
    /// Create a notifier over the shared connection registry.
    #[must_use]
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }
}

impl Notifier for HubNotifier {
    fn send_all(&self, method: &str, payload: &serde_json::Value) {
        let frame = ServerResponse::Notification {
            method: method.to_owned(),
            payload: payload.clone(),
        };
        self.connections.deliver(&frame, None);
    }

    fn send_to_group(&self, group_slug: &str, method: &str, payload: &serde_json::Value) {
        let frame = ServerResponse::Notification {
            method: method.to_owned(),
            payload: payload.clone(),
        };
        self.connections.deliver(&frame, Some(group_slug));
    }
}
