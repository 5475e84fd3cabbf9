use agent_switchboard::models::approval::{new_approval_id, ApprovalRequest, ApprovalResult};
use agent_switchboard::models::chat::{ChatEntry, ChatRole};
use agent_switchboard::models::notification::Notification;
use agent_switchboard::models::stream::{StreamMessage, ToolCall};

#[test]
fn approval_ids_are_short_lowercase_hex() {
    for _ in 0..32 {
        let id = new_approval_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn approval_request_copies_the_call_under_one_id() {
    let mut args = serde_json::Map::new();
    args.insert("cmd".to_owned(), serde_json::json!("ls"));
    let call = ToolCall::new("exec", args);

    let request = ApprovalRequest::for_call("beef0123", &call);
    assert_eq!(request.approval_id, "beef0123");
    assert_eq!(request.tool_name, "exec");
    assert_eq!(request.arguments["cmd"], "ls");
}

#[test]
fn stream_message_constructors_populate_one_field() {
    let content = StreamMessage::content("hi");
    assert_eq!(content.content.as_deref(), Some("hi"));
    assert!(!content.is_complete);

    let error = StreamMessage::error("boom");
    assert_eq!(error.error.as_deref(), Some("boom"));
    assert!(error.is_complete);

    let terminal = StreamMessage::content("done").complete().at_index(7);
    assert!(terminal.is_complete);
    assert_eq!(terminal.message_index, 7);
}

#[test]
fn stream_message_serialization_skips_empty_fields() {
    let frame = StreamMessage::content("hi");
    let json = serde_json::to_value(&frame).expect("serialize");

    assert_eq!(json["content"], "hi");
    assert!(json.get("reasoning").is_none());
    assert!(json.get("error").is_none());
    assert_eq!(json["is_complete"], false);
}

#[test]
fn notification_methods_and_scope() {
    let broadcast = Notification::StreamChanged {
        topic_id: "t1".into(),
        is_processing: true,
        group_slug: None,
    };
    assert_eq!(broadcast.method(), "OnStreamChanged");
    assert!(broadcast.group_slug().is_none());

    let scoped = Notification::ApprovalResolved {
        approval_id: "beef0123".into(),
        topic_id: "t1".into(),
        result: ApprovalResult::Approved,
        group_slug: Some("team".into()),
    };
    assert_eq!(scoped.method(), "OnApprovalResolved");
    assert_eq!(scoped.group_slug(), Some("team"));

    let json = serde_json::to_value(&scoped).expect("serialize");
    assert_eq!(json["kind"], "approval_resolved");
    assert_eq!(json["result"], "approved");
}

#[test]
fn chat_entry_carries_role_and_timestamp() {
    let entry = ChatEntry::new(41, ChatRole::User, "hello", "u1");
    assert_eq!(entry.message_id, 41);
    assert!(matches!(entry.role, ChatRole::User));
    assert!(entry.timestamp <= chrono::Utc::now());
}
