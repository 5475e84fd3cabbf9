//! Session lifecycle: end-session cleanup across components, turn
//! persistence, topic catalog maintenance, and the idle sweep.

use std::sync::Arc;
use std::time::Duration;

use agent_switchboard::agents::scripted::{ScriptedAgent, ScriptedStep};
use agent_switchboard::models::chat::ChatRole;
use agent_switchboard::models::stream::ToolCall;
use agent_switchboard::models::topic::TopicInfo;
use agent_switchboard::AppError;
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{spawn_gateway, test_config};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_message_without_a_session_fails() {
    let runtime = Arc::new(ScriptedAgent::new(Vec::new(), "done"));
    let gateway = spawn_gateway(runtime).await;

    let err = gateway
        .switchboard
        .send_message("ghost", "hi", "u1", None, CancellationToken::new())
        .expect_err("no session");
    assert!(matches!(err, AppError::UnknownSession(_)));

    gateway.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_session_cancels_stream_and_rejects_approvals() {
    let runtime = Arc::new(ScriptedAgent::new(
        vec![ScriptedStep::RequestApproval(vec![ToolCall::new(
            "exec",
            serde_json::Map::new(),
        )])],
        "done",
    ));
    let gateway = spawn_gateway(runtime).await;
    assert!(gateway
        .switchboard
        .start_session("t1", "a1", 100, 0, Some("team".to_owned())));

    let mut subscription = gateway
        .switchboard
        .send_message("t1", "run it", "u1", None, CancellationToken::new())
        .expect("session exists");
    let frame = subscription.next().await.expect("approval frame");
    let request = frame.approval_request.expect("approval request present");

    assert!(gateway.switchboard.end_session("t1"));

    // Stream state is gone, the subscriber ends, and the approval is no
    // longer pending.
    assert!(subscription.next().await.is_none());
    assert!(gateway.switchboard.stream_snapshot("t1").is_none());
    assert!(gateway.switchboard.registry().get("t1").is_none());
    assert!(!gateway.switchboard.is_approval_pending(&request.approval_id));

    // Cleanup announced to the session's space.
    assert_eq!(gateway.notifier.count_of("OnTopicChanged"), 1);
    assert!(!gateway.switchboard.end_session("t1"));

    gateway.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completed_turns_are_persisted_and_filtered_by_role() {
    let runtime = Arc::new(ScriptedAgent::new(
        vec![ScriptedStep::Content("Hello".into())],
        "world",
    ));
    let gateway = spawn_gateway(runtime).await;
    assert!(gateway.switchboard.start_session("t1", "a1", 100, 0, None));

    let mut subscription = gateway
        .switchboard
        .send_message("t1", "hi", "u1", None, CancellationToken::new())
        .expect("session exists");
    while let Some(frame) = subscription.next().await {
        if frame.is_complete {
            break;
        }
    }

    let history = gateway.switchboard.get_history("a1", 100, 0).await;
    assert_eq!(history.len(), 2);
    assert!(matches!(history[0].role, ChatRole::User));
    assert_eq!(history[0].content, "hi");
    assert_eq!(history[0].sender_id, "u1");
    assert!(matches!(history[1].role, ChatRole::Assistant));
    assert_eq!(history[1].content, "world");
    assert!(history[0].message_id < history[1].message_id);

    assert_eq!(gateway.notifier.count_of("OnNewMessage"), 1);

    gateway.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn topic_catalog_save_list_delete() {
    let runtime = Arc::new(ScriptedAgent::new(Vec::new(), "done"));
    let gateway = spawn_gateway(runtime).await;
    assert!(gateway.switchboard.start_session("t1", "a1", 100, 0, None));

    let topic = TopicInfo::new("t1", "a1", 100, 0, "First chat", None);
    gateway
        .switchboard
        .save_topic(&topic, true)
        .await
        .expect("save");

    let topics = gateway.switchboard.get_all_topics("a1", None).await;
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].title, "First chat");

    gateway
        .switchboard
        .delete_topic("a1", "t1", 100, 0)
        .await
        .expect("delete");

    assert!(gateway.switchboard.get_all_topics("a1", None).await.is_empty());
    assert!(gateway.switchboard.registry().get("t1").is_none());
    assert!(gateway.switchboard.get_history("a1", 100, 0).await.is_empty());
    // One notification for the save, one for the delete.
    assert_eq!(gateway.notifier.count_of("OnTopicChanged"), 2);

    gateway.cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn idle_sessions_are_swept_through_full_cleanup() {
    let mut config = test_config();
    config.timeouts.session_idle_seconds = 1;

    let runtime = Arc::new(ScriptedAgent::new(Vec::new(), "done"));
    let gateway = super::test_helpers::spawn_gateway_with(config, runtime).await;
    let sweep = Arc::clone(&gateway.switchboard)
        .spawn_idle_sweep(gateway.cancel.clone())
        .expect("sweep enabled");

    assert!(gateway.switchboard.start_session("t1", "a1", 100, 0, None));
    tokio::time::sleep(Duration::from_millis(2600)).await;

    assert!(gateway.switchboard.registry().get("t1").is_none());

    gateway.cancel.cancel();
    let _ = sweep.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sweep_is_disabled_when_configured_off() {
    let runtime = Arc::new(ScriptedAgent::new(Vec::new(), "done"));
    // The default test config disables the sweep.
    let gateway = spawn_gateway(runtime).await;
    assert!(Arc::clone(&gateway.switchboard)
        .spawn_idle_sweep(gateway.cancel.clone())
        .is_none());
    gateway.cancel.cancel();
}
