use std::time::Duration;

use agent_switchboard::core::registry::SessionRegistry;
use agent_switchboard::models::session::Session;

fn registry() -> SessionRegistry {
    SessionRegistry::new(vec!["a1".into(), "a2".into()])
}

#[test]
fn start_session_binds_both_directions() {
    let registry = registry();
    assert!(registry.start_session(Session::new("t1", "a1", 100, 0, None)));

    let session = registry.get("t1").expect("session exists");
    assert_eq!(session.agent_id, "a1");
    assert_eq!(registry.topic_by_chat(100).as_deref(), Some("t1"));
}

#[test]
fn unknown_agent_is_rejected() {
    let registry = registry();
    assert!(!registry.start_session(Session::new("t1", "nope", 100, 0, None)));
    assert!(registry.get("t1").is_none());
    assert!(registry.is_empty());
}

#[test]
fn identical_reinsert_is_a_noop() {
    let registry = registry();
    let session = Session::new("t1", "a1", 100, 0, None);
    assert!(registry.start_session(session.clone()));
    assert!(registry.start_session(session));
    assert_eq!(registry.len(), 1);
}

#[test]
fn rebinding_a_topic_drops_the_stale_reverse_entry() {
    let registry = registry();
    assert!(registry.start_session(Session::new("t1", "a1", 100, 0, None)));
    assert!(registry.start_session(Session::new("t1", "a1", 200, 0, None)));

    assert!(registry.topic_by_chat(100).is_none());
    assert_eq!(registry.topic_by_chat(200).as_deref(), Some("t1"));
}

#[test]
fn rebinding_a_chat_evicts_the_old_topic() {
    let registry = registry();
    assert!(registry.start_session(Session::new("t1", "a1", 100, 0, None)));
    assert!(registry.start_session(Session::new("t2", "a1", 100, 0, None)));

    // One chat backs at most one topic.
    assert!(registry.get("t1").is_none());
    assert_eq!(registry.topic_by_chat(100).as_deref(), Some("t2"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn remove_clears_both_indexes() {
    let registry = registry();
    registry.start_session(Session::new("t1", "a1", 100, 0, None));
    registry.start_session(Session::new("t2", "a2", 200, 7, Some("team".into())));

    let removed = registry.remove("t1").expect("was bound");
    assert_eq!(removed.chat_id, 100);
    assert!(registry.get("t1").is_none());
    assert!(registry.topic_by_chat(100).is_none());

    // The sibling session is untouched.
    assert_eq!(registry.topic_by_chat(200).as_deref(), Some("t2"));
    assert!(registry.remove("t1").is_none());
}

#[test]
fn idle_topics_reports_only_stale_sessions() {
    let registry = registry();
    registry.start_session(Session::new("t1", "a1", 100, 0, None));

    assert!(registry.idle_topics(Duration::from_secs(60)).is_empty());

    std::thread::sleep(Duration::from_millis(30));
    let idle = registry.idle_topics(Duration::from_millis(10));
    assert_eq!(idle, vec!["t1".to_owned()]);

    registry.touch("t1");
    assert!(registry.idle_topics(Duration::from_millis(10)).is_empty());
}
