//! Transport-facing WebSocket hub: JSON request/response framing over
//! axum, per-connection typed context, group membership, and the
//! notification fan-out implementation.

pub mod app;
pub mod connection;
pub mod groups;
pub mod requests;
pub mod responses;

pub use app::{router, serve, serve_on_listener, HubState};
pub use groups::{ConnectionRegistry, HubNotifier};
