//! WebSocket connection lifecycle: recv loop and request dispatch.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::broker::Subscription;
use crate::models::stream::StreamMessage;
use crate::AppError;

use super::app::HubState;
use super::requests::ClientRequest;
use super::responses::ServerResponse;

/// Typed per-connection context.
struct ConnectionContext {
    id: Uuid,
    user_id: Option<String>,
    cancel: CancellationToken,
}

pub(crate) async fn handle_socket(socket: WebSocket, state: Arc<HubState>) {
    let id = Uuid::new_v4();
    let cancel = state.cancel.child_token();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerResponse>();
    state.connections.register(id, outbound.clone());
    debug!(connection = %id, "connection opened");

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "outbound frame serialization failed");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut ctx = ConnectionContext {
        id,
        user_id: None,
        cancel: cancel.clone(),
    };

    loop {
        let received = tokio::select! {
            received = stream.next() => received,
            () = cancel.cancelled() => break,
        };
        let Some(result) = received else { break };
        let msg = match result {
            Ok(msg) => msg,
            Err(err) => {
                debug!(connection = %id, %err, "read error (client closed?)");
                break;
            }
        };
        let text = match msg {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };
        dispatch(&text, &mut ctx, &state, &outbound).await;
    }

    cancel.cancel();
    state.connections.unregister(id);
    writer.abort();
    debug!(connection = %id, "connection closed");
}

fn send(outbound: &mpsc::UnboundedSender<ServerResponse>, frame: ServerResponse) {
    // A closed queue means the connection is tearing down.
    let _ = outbound.send(frame);
}

fn send_result(
    outbound: &mpsc::UnboundedSender<ServerResponse>,
    id: String,
    data: serde_json::Value,
) {
    send(outbound, ServerResponse::Result { id, data });
}

fn send_error(
    outbound: &mpsc::UnboundedSender<ServerResponse>,
    id: Option<String>,
    error: impl Into<String>,
) {
    send(
        outbound,
        ServerResponse::Error {
            id,
            error: error.into(),
        },
    );
}

/// Forward a stream (optional prefix, then the live tail) to the
/// connection as `StreamFrame`s, closing with `StreamEnd`.
fn spawn_forwarder(
    outbound: mpsc::UnboundedSender<ServerResponse>,
    request_id: String,
    prefix: Vec<StreamMessage>,
    subscription: Option<Subscription>,
) {
    tokio::spawn(async move {
        for frame in prefix {
            send(
                &outbound,
                ServerResponse::StreamFrame {
                    id: request_id.clone(),
                    frame,
                },
            );
        }
        if let Some(mut subscription) = subscription {
            while let Some(frame) = subscription.next().await {
                if outbound
                    .send(ServerResponse::StreamFrame {
                        id: request_id.clone(),
                        frame,
                    })
                    .is_err()
                {
                    return;
                }
            }
        }
        send(&outbound, ServerResponse::StreamEnd { id: request_id });
    });
}

#[allow(clippy::too_many_lines)] // One arm per hub method keeps the surface in one place.
async fn dispatch(
    text: &str,
    ctx: &mut ConnectionContext,
    state: &Arc<HubState>,
    outbound: &mpsc::UnboundedSender<ServerResponse>,
) {
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(err) => {
            send_error(outbound, None, format!("parse error: {err}"));
            return;
        }
    };

    let switchboard = &state.switchboard;
    match request {
        ClientRequest::RegisterUser { id, user_id } => {
            if user_id.trim().is_empty() {
                send_error(outbound, Some(id), "user id must not be empty");
                return;
            }
            ctx.user_id = Some(user_id);
            send_result(outbound, id, serde_json::json!(true));
        }
        ClientRequest::GetAgents { id } => {
            send_result(outbound, id, serde_json::json!(switchboard.agents()));
        }
        ClientRequest::ValidateAgent { id, agent_id } => {
            send_result(
                outbound,
                id,
                serde_json::json!(switchboard.validate_agent(&agent_id)),
            );
        }
        ClientRequest::StartSession {
            id,
            agent_id,
            topic_id,
            chat_id,
            thread_id,
            group_slug,
        } => {
            let started = switchboard.start_session(
                &topic_id,
                &agent_id,
                chat_id,
                thread_id,
                group_slug.clone(),
            );
            if started {
                if let Some(group) = group_slug {
                    state.connections.set_group(ctx.id, Some(group));
                }
            }
            send_result(outbound, id, serde_json::json!(started));
        }
        ClientRequest::JoinSpace { id, group_slug } => {
            match state.spaces.iter().find(|space| space.slug == group_slug) {
                Some(space) => {
                    state.connections.set_group(ctx.id, Some(space.slug.clone()));
                    send_result(outbound, id, serde_json::json!(space));
                }
                None => send_result(outbound, id, serde_json::Value::Null),
            }
        }
        ClientRequest::GetHistory {
            id,
            agent_id,
            chat_id,
            thread_id,
        } => {
            let entries = switchboard.get_history(&agent_id, chat_id, thread_id).await;
            send_result(outbound, id, serde_json::json!(entries));
        }
        ClientRequest::GetAllTopics {
            id,
            agent_id,
            group_slug,
        } => {
            let topics = switchboard
                .get_all_topics(&agent_id, group_slug.as_deref())
                .await;
            send_result(outbound, id, serde_json::json!(topics));
        }
        ClientRequest::IsProcessing { id, topic_id } => {
            send_result(
                outbound,
                id,
                serde_json::json!(switchboard.is_processing(&topic_id)),
            );
        }
        ClientRequest::GetStreamState { id, topic_id } => {
            send_result(
                outbound,
                id,
                serde_json::json!(switchboard.stream_snapshot(&topic_id)),
            );
        }
        ClientRequest::ResumeStream { id, topic_id } => {
            let (prefix, subscription) =
                switchboard.resume_stream(&topic_id, ctx.cancel.child_token());
            spawn_forwarder(outbound.clone(), id, prefix, subscription);
        }
        ClientRequest::SendMessage {
            id,
            topic_id,
            text,
            correlation_id,
        } => {
            let Some(sender) = ctx.user_id.clone() else {
                send_error(
                    outbound,
                    Some(id),
                    AppError::NotRegistered("register a user before sending".into()).to_string(),
                );
                return;
            };
            match switchboard.send_message(
                &topic_id,
                &text,
                &sender,
                correlation_id,
                ctx.cancel.child_token(),
            ) {
                Ok(subscription) => {
                    spawn_forwarder(outbound.clone(), id, Vec::new(), Some(subscription));
                }
                Err(err) => send_error(outbound, Some(id), err.to_string()),
            }
        }
        ClientRequest::EnqueueMessage {
            id,
            topic_id,
            text,
            correlation_id,
        } => {
            let Some(sender) = ctx.user_id.clone() else {
                send_error(
                    outbound,
                    Some(id),
                    AppError::NotRegistered("register a user before sending".into()).to_string(),
                );
                return;
            };
            match switchboard.enqueue_message(&topic_id, &text, &sender, correlation_id) {
                Ok(accepted) => send_result(outbound, id, serde_json::json!(accepted)),
                Err(err) => send_error(outbound, Some(id), err.to_string()),
            }
        }
        ClientRequest::CancelTopic { id, topic_id } => {
            switchboard.cancel_topic(&topic_id);
            send_result(outbound, id, serde_json::Value::Null);
        }
        ClientRequest::DeleteTopic {
            id,
            agent_id,
            topic_id,
            chat_id,
            thread_id,
        } => {
            match switchboard
                .delete_topic(&agent_id, &topic_id, chat_id, thread_id)
                .await
            {
                Ok(()) => send_result(outbound, id, serde_json::Value::Null),
                Err(err) => send_error(outbound, Some(id), err.to_string()),
            }
        }
        ClientRequest::SaveTopic { id, topic, is_new } => {
            match switchboard.save_topic(&topic, is_new).await {
                Ok(()) => send_result(outbound, id, serde_json::Value::Null),
                Err(err) => send_error(outbound, Some(id), err.to_string()),
            }
        }
        ClientRequest::RespondToApproval {
            id,
            approval_id,
            result,
        } => {
            send_result(
                outbound,
                id,
                serde_json::json!(switchboard.respond_to_approval(&approval_id, result)),
            );
        }
        ClientRequest::IsApprovalPending { id, approval_id } => {
            send_result(
                outbound,
                id,
                serde_json::json!(switchboard.is_approval_pending(&approval_id)),
            );
        }
        ClientRequest::GetPendingApprovalForTopic { id, topic_id } => {
            send_result(
                outbound,
                id,
                serde_json::json!(switchboard.pending_approval_for_topic(&topic_id)),
            );
        }
    }
}
