//! Gateway configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// A configured agent the gateway can dispatch prompts to.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentEntry {
    /// Stable agent identifier used by transports.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// One-line description shown in agent pickers.
    #[serde(default)]
    pub description: String,
}

/// A named space (group) that scopes notifications to its member connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SpaceEntry {
    /// URL-safe slug transports join by.
    pub slug: String,
    /// Human-readable display name.
    pub name: String,
}

/// Stream broker tuning. Defaults match the reference behavior.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Replay buffer capacity per topic; oldest entries are evicted.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Bounded queue capacity per subscriber.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
    /// Seconds a completed stream stays readable before removal.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            subscriber_capacity: default_subscriber_capacity(),
            grace_seconds: default_grace_seconds(),
        }
    }
}

/// Configurable timeout values (seconds) for blocking interactions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Approval request timeout.
    #[serde(default = "default_approval_seconds")]
    pub approval_seconds: u64,
    /// Idle threshold after which a session is ended; 0 disables the sweep.
    #[serde(default = "default_session_idle_seconds")]
    pub session_idle_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            approval_seconds: default_approval_seconds(),
            session_idle_seconds: default_session_idle_seconds(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_subscriber_capacity() -> usize {
    64
}

fn default_grace_seconds() -> u64 {
    5
}

fn default_approval_seconds() -> u64 {
    120
}

fn default_session_idle_seconds() -> u64 {
    3600
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "switchboard.db".to_owned()
}

/// Gateway configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// HTTP port the WebSocket hub listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Path of the `SQLite` history database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Agents available for dispatch.
    pub agents: Vec<AgentEntry>,
    /// Named spaces connections may join.
    #[serde(default)]
    pub spaces: Vec<SpaceEntry>,
    /// Stream broker tuning.
    #[serde(default)]
    pub stream: StreamConfig,
    /// Timeout configuration for blocking flows.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl GatewayConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Replay grace window as a [`Duration`].
    #[must_use]
    pub fn grace_window(&self) -> Duration {
        Duration::from_secs(self.stream.grace_seconds)
    }

    /// Approval timeout as a [`Duration`].
    #[must_use]
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.approval_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(AppError::Config("agents must not be empty".into()));
        }

        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                return Err(AppError::Config("agent id must not be empty".into()));
            }
            let duplicates = self.agents.iter().filter(|a| a.id == agent.id).count();
            if duplicates > 1 {
                return Err(AppError::Config(format!(
                    "duplicate agent id: {}",
                    agent.id
                )));
            }
        }

        for space in &self.spaces {
            if space.slug.trim().is_empty() {
                return Err(AppError::Config("space slug must not be empty".into()));
            }
            let duplicates = self.spaces.iter().filter(|s| s.slug == space.slug).count();
            if duplicates > 1 {
                return Err(AppError::Config(format!(
                    "duplicate space slug: {}",
                    space.slug
                )));
            }
        }

        if self.stream.buffer_capacity == 0 {
            return Err(AppError::Config(
                "stream.buffer_capacity must be greater than zero".into(),
            ));
        }
        if self.stream.subscriber_capacity == 0 {
            return Err(AppError::Config(
                "stream.subscriber_capacity must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
