use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_switchboard::core::approvals::ApprovalGate;
use agent_switchboard::core::broker::StreamBroker;
use agent_switchboard::core::notify::{Notifications, Notifier, NullNotifier};
use agent_switchboard::models::approval::ApprovalResult;
use agent_switchboard::models::stream::ToolCall;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(Option<String>, String)>>,
}

impl Notifier for RecordingNotifier {
    fn send_all(&self, method: &str, _payload: &serde_json::Value) {
        self.calls.lock().unwrap().push((None, method.to_owned()));
    }

    fn send_to_group(&self, group_slug: &str, method: &str, _payload: &serde_json::Value) {
        self.calls
            .lock()
            .unwrap()
            .push((Some(group_slug.to_owned()), method.to_owned()));
    }
}

fn exec_call() -> ToolCall {
    let mut args = serde_json::Map::new();
    args.insert("cmd".to_owned(), serde_json::json!("ls"));
    ToolCall::new("exec", args)
}

fn gate_with(
    broker: &StreamBroker,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
) -> Arc<ApprovalGate> {
    Arc::new(ApprovalGate::new(
        broker.clone(),
        Notifications::new(notifier),
        timeout,
    ))
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn respond_to_unknown_id_returns_false() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    let gate = gate_with(&broker, Arc::new(NullNotifier), Duration::from_secs(5));

    assert!(!gate.respond("deadbeef", ApprovalResult::Approved));
}

#[tokio::test]
async fn approval_resolves_the_waiter_and_clears_the_entry() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    broker.create_stream("t1", "hi", "u1");
    let mut subscription = broker
        .subscribe("t1", CancellationToken::new())
        .expect("stream exists");
    let gate = gate_with(&broker, Arc::new(NullNotifier), Duration::from_secs(5));

    let waiter_gate = Arc::clone(&gate);
    let ct = CancellationToken::new();
    let waiter = tokio::spawn(async move {
        waiter_gate
            .request_approval("t1", None, &[exec_call()], 3, &ct)
            .await
    });

    let pending_gate = Arc::clone(&gate);
    wait_until(move || pending_gate.pending_for_topic("t1").is_some()).await;
    let request = gate.pending_for_topic("t1").expect("pending entry");
    assert_eq!(request.tool_name, "exec");
    assert!(gate.is_pending(&request.approval_id));

    // The request frame reached the stream before the waiter suspended.
    let frame = subscription.next().await.expect("approval frame");
    let in_frame = frame.approval_request.expect("approval request present");
    assert_eq!(in_frame.approval_id, request.approval_id);
    assert_eq!(frame.message_index, 3);

    assert!(gate.respond(&request.approval_id, ApprovalResult::Approved));
    let outcome = waiter.await.expect("waiter finished");
    assert_eq!(outcome, ApprovalResult::Approved);

    assert!(!gate.is_pending(&request.approval_id));
    assert!(gate.pending_for_topic("t1").is_none());
}

#[tokio::test]
async fn double_respond_is_idempotent_and_first_result_wins() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    broker.create_stream("t1", "hi", "u1");
    let gate = gate_with(&broker, Arc::new(NullNotifier), Duration::from_secs(5));

    let waiter_gate = Arc::clone(&gate);
    let ct = CancellationToken::new();
    let waiter = tokio::spawn(async move {
        waiter_gate
            .request_approval("t1", None, &[exec_call()], 1, &ct)
            .await
    });

    let pending_gate = Arc::clone(&gate);
    wait_until(move || pending_gate.pending_for_topic("t1").is_some()).await;
    let id = gate.pending_for_topic("t1").expect("pending").approval_id;

    assert!(gate.respond(&id, ApprovalResult::Approved));
    assert!(gate.respond(&id, ApprovalResult::Rejected));

    let outcome = waiter.await.expect("waiter finished");
    assert_eq!(outcome, ApprovalResult::Approved);
}

#[tokio::test]
async fn timeout_rejects_and_writes_a_user_visible_frame() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    broker.create_stream("t1", "hi", "u1");
    let recorder = Arc::new(RecordingNotifier::default());
    let gate = gate_with(&broker, Arc::clone(&recorder) as Arc<dyn Notifier>, Duration::from_millis(100));

    let ct = CancellationToken::new();
    let outcome = gate.request_approval("t1", None, &[exec_call()], 1, &ct).await;
    assert_eq!(outcome, ApprovalResult::Rejected);

    let snapshot = broker.snapshot("t1").expect("stream alive");
    let timeout_frame = snapshot
        .buffered_messages
        .iter()
        .find(|m| m.user_message.is_some())
        .expect("timeout frame written");
    assert!(timeout_frame
        .user_message
        .as_deref()
        .unwrap()
        .contains("timed out"));

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "OnApprovalResolved");
}

#[tokio::test]
async fn caller_cancellation_rejects() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    broker.create_stream("t1", "hi", "u1");
    let gate = gate_with(&broker, Arc::new(NullNotifier), Duration::from_secs(5));

    let ct = CancellationToken::new();
    ct.cancel();
    let outcome = gate.request_approval("t1", None, &[exec_call()], 1, &ct).await;
    assert_eq!(outcome, ApprovalResult::Rejected);
    assert!(gate.pending_for_topic("t1").is_none());
}

#[tokio::test]
async fn cancel_for_topic_rejects_every_waiter() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    broker.create_stream("t1", "hi", "u1");
    let gate = gate_with(&broker, Arc::new(NullNotifier), Duration::from_secs(5));

    let waiter_gate = Arc::clone(&gate);
    let ct = CancellationToken::new();
    let waiter = tokio::spawn(async move {
        waiter_gate
            .request_approval("t1", None, &[exec_call()], 1, &ct)
            .await
    });

    let pending_gate = Arc::clone(&gate);
    wait_until(move || pending_gate.pending_for_topic("t1").is_some()).await;
    gate.cancel_for_topic("t1");

    let outcome = waiter.await.expect("waiter finished");
    assert_eq!(outcome, ApprovalResult::Rejected);
    assert!(gate.pending_for_topic("t1").is_none());
}

#[tokio::test]
async fn auto_approval_writes_an_informational_frame_without_an_entry() {
    let broker = StreamBroker::new(100, 8, Duration::from_secs(5));
    broker.create_stream("t1", "hi", "u1");
    let gate = gate_with(&broker, Arc::new(NullNotifier), Duration::from_secs(5));

    let outcome = gate.notify_auto_approved("t1", &[exec_call()], 1).await;
    assert_eq!(outcome, ApprovalResult::AutoApproved);
    assert!(gate.pending_for_topic("t1").is_none());

    let snapshot = broker.snapshot("t1").expect("stream alive");
    let frame = snapshot.buffered_messages.first().expect("frame written");
    let calls = frame.tool_calls.as_ref().expect("tool calls present");
    assert_eq!(calls[0].name, "exec");
}
