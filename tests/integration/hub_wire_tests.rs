//! WebSocket hub round-trips: request/response framing, registration
//! gating, streaming delivery, spaces, and group-scoped notifications.

use std::sync::Arc;
use std::time::Duration;

use agent_switchboard::agents::scripted::{ScriptedAgent, ScriptedStep};
use agent_switchboard::agents::AgentRuntime;
use agent_switchboard::core::gateway::Switchboard;
use agent_switchboard::core::notify::Notifier;
use agent_switchboard::hub::{self, ConnectionRegistry, HubNotifier, HubState};
use agent_switchboard::persistence::{db, store::SqliteHistoryStore};
use agent_switchboard::worker::AgentWorker;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use super::test_helpers::test_config;

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct RunningHub {
    url: String,
    cancel: CancellationToken,
}

async fn spawn_hub(runtime: Arc<dyn AgentRuntime>) -> RunningHub {
    let config = test_config();
    let database = Arc::new(db::open_in_memory().await.expect("db connect"));
    let history = Arc::new(SqliteHistoryStore::new(database));
    let connections = Arc::new(ConnectionRegistry::default());
    let notifier = Arc::new(HubNotifier::new(Arc::clone(&connections)));
    let (switchboard, prompts) = Switchboard::new(&config, history, notifier as Arc<dyn Notifier>);

    let cancel = CancellationToken::new();
    let worker = AgentWorker::new(Arc::clone(&switchboard), runtime);
    let _loop_handle = worker.spawn(prompts, cancel.clone());

    let state = Arc::new(HubState {
        switchboard,
        connections,
        spaces: config.spaces.clone(),
        cancel: cancel.clone(),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(hub::serve_on_listener(listener, state));

    RunningHub {
        url: format!("ws://{addr}/ws"),
        cancel,
    }
}

async fn connect(hub: &RunningHub) -> WsClient {
    let (client, _) = tokio_tungstenite::connect_async(hub.url.as_str())
        .await
        .expect("connect");
    client
}

async fn send(client: &mut WsClient, request: serde_json::Value) {
    client
        .send(WsMessage::Text(request.to_string()))
        .await
        .expect("send");
}

async fn next_frame(client: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("frame before timeout")
            .expect("connection open")
            .expect("read ok");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(&text).expect("valid json");
        }
    }
}

/// Read frames until the response (result or error) for `id`, skipping
/// pushed notifications.
async fn response_for(client: &mut WsClient, id: &str) -> serde_json::Value {
    loop {
        let frame = next_frame(client).await;
        let matches_id = frame["id"] == id;
        let frame_type = frame["type"].as_str().unwrap_or_default();
        if matches_id && (frame_type == "result" || frame_type == "error") {
            return frame;
        }
    }
}

/// Collect stream frames for `id` until `stream_end`, skipping pushed
/// notifications.
async fn stream_frames_for(client: &mut WsClient, id: &str) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    loop {
        let frame = next_frame(client).await;
        if frame["id"] != id {
            continue;
        }
        match frame["type"].as_str().unwrap_or_default() {
            "stream_frame" => frames.push(frame["frame"].clone()),
            "stream_end" => return frames,
            "error" => panic!("unexpected error frame: {frame}"),
            _ => {}
        }
    }
}

fn scripted_hello_world() -> Arc<dyn AgentRuntime> {
    Arc::new(ScriptedAgent::new(
        vec![ScriptedStep::Content("Hello".into())],
        "world",
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_round_trip_over_the_wire() {
    let hub = spawn_hub(scripted_hello_world()).await;
    let mut client = connect(&hub).await;

    send(
        &mut client,
        serde_json::json!({"type": "register_user", "id": "r1", "user_id": "u1"}),
    )
    .await;
    assert_eq!(response_for(&mut client, "r1").await["data"], true);

    send(&mut client, serde_json::json!({"type": "get_agents", "id": "r2"})).await;
    let agents = response_for(&mut client, "r2").await;
    assert_eq!(agents["data"][0]["id"], "a1");

    send(
        &mut client,
        serde_json::json!({"type": "validate_agent", "id": "r3", "agent_id": "a1"}),
    )
    .await;
    assert_eq!(response_for(&mut client, "r3").await["data"], true);

    send(
        &mut client,
        serde_json::json!({
            "type": "start_session", "id": "r4", "agent_id": "a1",
            "topic_id": "t1", "chat_id": 100, "thread_id": 0
        }),
    )
    .await;
    assert_eq!(response_for(&mut client, "r4").await["data"], true);

    send(
        &mut client,
        serde_json::json!({"type": "send_message", "id": "r5", "topic_id": "t1", "text": "hi"}),
    )
    .await;
    let frames = stream_frames_for(&mut client, "r5").await;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["content"], "Hello");
    assert_eq!(frames[0]["sequence_number"], 1);
    assert_eq!(frames[1]["content"], "world");
    assert_eq!(frames[1]["is_complete"], true);

    send(
        &mut client,
        serde_json::json!({"type": "get_stream_state", "id": "r6", "topic_id": "t1"}),
    )
    .await;
    let state = response_for(&mut client, "r6").await;
    assert_eq!(state["data"]["is_processing"], false);
    assert_eq!(state["data"]["last_sequence"], 2);

    hub.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sending_before_registration_is_a_hub_error() {
    let hub = spawn_hub(scripted_hello_world()).await;
    let mut client = connect(&hub).await;

    send(
        &mut client,
        serde_json::json!({"type": "send_message", "id": "r1", "topic_id": "t1", "text": "hi"}),
    )
    .await;
    let response = response_for(&mut client, "r1").await;
    assert_eq!(response["type"], "error");
    assert!(response["error"]
        .as_str()
        .unwrap_or_default()
        .contains("register"));

    hub.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_user_id_is_rejected() {
    let hub = spawn_hub(scripted_hello_world()).await;
    let mut client = connect(&hub).await;

    send(
        &mut client,
        serde_json::json!({"type": "register_user", "id": "r1", "user_id": "  "}),
    )
    .await;
    assert_eq!(response_for(&mut client, "r1").await["type"], "error");

    hub.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn join_space_returns_the_descriptor_or_null() {
    let hub = spawn_hub(scripted_hello_world()).await;
    let mut client = connect(&hub).await;

    send(
        &mut client,
        serde_json::json!({"type": "join_space", "id": "r1", "group_slug": "team"}),
    )
    .await;
    let joined = response_for(&mut client, "r1").await;
    assert_eq!(joined["data"]["slug"], "team");
    assert_eq!(joined["data"]["name"], "Team Room");

    send(
        &mut client,
        serde_json::json!({"type": "join_space", "id": "r2", "group_slug": "nowhere"}),
    )
    .await;
    assert!(response_for(&mut client, "r2").await["data"].is_null());

    hub.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn group_notifications_reach_members_only() {
    let hub = spawn_hub(scripted_hello_world()).await;
    let mut member = connect(&hub).await;
    let mut outsider = connect(&hub).await;

    // Member joins the space and runs a session scoped to it.
    send(
        &mut member,
        serde_json::json!({"type": "register_user", "id": "r1", "user_id": "u1"}),
    )
    .await;
    response_for(&mut member, "r1").await;
    send(
        &mut member,
        serde_json::json!({
            "type": "start_session", "id": "r2", "agent_id": "a1",
            "topic_id": "t1", "chat_id": 100, "thread_id": 0, "group_slug": "team"
        }),
    )
    .await;
    response_for(&mut member, "r2").await;

    send(
        &mut member,
        serde_json::json!({"type": "send_message", "id": "r3", "topic_id": "t1", "text": "hi"}),
    )
    .await;

    // The member sees the scoped user-message notification.
    let notification = loop {
        let frame = next_frame(&mut member).await;
        if frame["type"] == "notification" {
            break frame;
        }
    };
    assert_eq!(notification["method"], "OnUserMessage");
    assert_eq!(notification["payload"]["group_slug"], "team");

    // The outsider receives nothing within the window.
    let silence = tokio::time::timeout(Duration::from_millis(400), outsider.next()).await;
    assert!(silence.is_err(), "outsider must not receive group traffic");

    hub.cancel.cancel();
}
