use agent_switchboard::config::GatewayConfig;
use agent_switchboard::AppError;

fn minimal_toml() -> &'static str {
    r#"
[[agents]]
id = "a1"
name = "Assistant"
"#
}

#[test]
fn minimal_config_gets_reference_defaults() {
    let config = GatewayConfig::from_toml_str(minimal_toml()).expect("valid config");

    assert_eq!(config.http_port, 8080);
    assert_eq!(config.db_path, "switchboard.db");
    assert_eq!(config.stream.buffer_capacity, 100);
    assert_eq!(config.stream.subscriber_capacity, 64);
    assert_eq!(config.stream.grace_seconds, 5);
    assert_eq!(config.timeouts.approval_seconds, 120);
    assert_eq!(config.timeouts.session_idle_seconds, 3600);
    assert!(config.spaces.is_empty());
}

#[test]
fn full_config_parses() {
    let toml = r#"
http_port = 9001
db_path = "data/gw.db"

[[agents]]
id = "a1"
name = "Assistant"
description = "General assistant"

[[agents]]
id = "a2"
name = "Researcher"

[[spaces]]
slug = "team"
name = "Team Room"

[stream]
buffer_capacity = 10
subscriber_capacity = 4
grace_seconds = 1

[timeouts]
approval_seconds = 2
session_idle_seconds = 0
"#;
    let config = GatewayConfig::from_toml_str(toml).expect("valid config");

    assert_eq!(config.http_port, 9001);
    assert_eq!(config.agents.len(), 2);
    assert_eq!(config.agents[0].description, "General assistant");
    assert_eq!(config.spaces[0].slug, "team");
    assert_eq!(config.stream.buffer_capacity, 10);
    assert_eq!(config.grace_window().as_secs(), 1);
    assert_eq!(config.approval_timeout().as_secs(), 2);
}

#[test]
fn empty_agent_list_is_rejected() {
    let err = GatewayConfig::from_toml_str("agents = []").expect_err("must fail");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn duplicate_agent_id_is_rejected() {
    let toml = r#"
[[agents]]
id = "a1"
name = "One"

[[agents]]
id = "a1"
name = "Two"
"#;
    let err = GatewayConfig::from_toml_str(toml).expect_err("must fail");
    assert!(err.to_string().contains("duplicate agent id"));
}

#[test]
fn duplicate_space_slug_is_rejected() {
    let toml = r#"
[[agents]]
id = "a1"
name = "One"

[[spaces]]
slug = "team"
name = "Team"

[[spaces]]
slug = "team"
name = "Other"
"#;
    let err = GatewayConfig::from_toml_str(toml).expect_err("must fail");
    assert!(err.to_string().contains("duplicate space slug"));
}

#[test]
fn zero_buffer_capacity_is_rejected() {
    let toml = r#"
[[agents]]
id = "a1"
name = "One"

[stream]
buffer_capacity = 0
"#;
    let err = GatewayConfig::from_toml_str(toml).expect_err("must fail");
    assert!(err.to_string().contains("buffer_capacity"));
}
