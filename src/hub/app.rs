//! Axum app: hub state, router, and WebSocket upgrade handler.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::SpaceEntry;
use crate::core::gateway::Switchboard;
use crate::{AppError, Result};

use super::connection::handle_socket;
use super::groups::ConnectionRegistry;

/// Shared state of the WebSocket hub.
pub struct HubState {
    /// Gateway core.
    pub switchboard: Arc<Switchboard>,
    /// Live connections and their group membership.
    pub connections: Arc<ConnectionRegistry>,
    /// Spaces connections may join.
    pub spaces: Vec<SpaceEntry>,
    /// Root token; cancelling it drains every connection.
    pub cancel: CancellationToken,
}

/// Build the hub router.
pub fn router(state: Arc<HubState>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<HubState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run the hub on an existing listener. Used by tests (bind to
/// 127.0.0.1:0, then pass the listener).
///
/// # Errors
///
/// Returns `AppError::Hub` if serving fails.
pub async fn serve_on_listener(listener: TcpListener, state: Arc<HubState>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("hub listening on ws://{addr}/ws");
    let shutdown = state.cancel.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|err| AppError::Hub(format!("hub server failed: {err}")))
}

/// Bind the configured port and run the hub.
///
/// # Errors
///
/// Returns `AppError::Io` if the bind fails, `AppError::Hub` if serving
/// fails.
pub async fn serve(port: u16, state: Arc<HubState>) -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    serve_on_listener(listener, state).await
}
