//! Agent descriptors exposed to transports.

use serde::{Deserialize, Serialize};

use crate::config::AgentEntry;

/// Describes one dispatchable agent, as returned by agent listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentDescriptor {
    /// Stable agent identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// One-line description.
    pub description: String,
}

impl From<&AgentEntry> for AgentDescriptor {
    fn from(entry: &AgentEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            description: entry.description.clone(),
        }
    }
}
