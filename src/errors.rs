//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Transport call arrived before the connection registered a user.
    NotRegistered(String),
    /// The topic has no session in the registry.
    UnknownSession(String),
    /// The approval id is expired or never existed.
    UnknownApproval(String),
    /// The agent id is not in the configured catalog.
    UnknownAgent(String),
    /// The underlying agent runtime failed mid-turn.
    Agent(String),
    /// Hub protocol violation or delivery failure.
    Hub(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::NotRegistered(msg) => write!(f, "not registered: {msg}"),
            Self::UnknownSession(msg) => write!(f, "unknown session: {msg}"),
            Self::UnknownApproval(msg) => write!(f, "unknown approval: {msg}"),
            Self::UnknownAgent(msg) => write!(f, "unknown agent: {msg}"),
            Self::Agent(msg) => write!(f, "agent: {msg}"),
            Self::Hub(msg) => write!(f, "hub: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Hub(format!("payload serialization failed: {err}"))
    }
}
