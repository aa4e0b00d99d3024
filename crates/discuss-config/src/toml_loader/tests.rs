//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use discuss_common::ConfigError;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_discuss_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[realtime]
base_url = "wss://erp.example.com/ws"
heartbeat_outgoing_ms = 20000
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.endpoint(), "wss://erp.example.com/ws/discuss");
    assert_eq!(config.realtime.heartbeat_outgoing_ms, 20_000);
    // Defaults preserved
    assert_eq!(config.realtime.reconnect_delay_ms, 5000);
    assert_eq!(config.topics.channel_topic_prefix, "/topic/channels");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn out_of_range_values_still_parse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[realtime]\nreconnect_delay_ms = 1\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.reconnect_delay_ms, 1);
    assert!(crate::validation::validate(&config).is_err());
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("discuss").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.endpoint(), "ws://localhost:8080/ws/discuss");
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::DiscussConfig;

    let config: DiscussConfig = toml::from_str(default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    // May be unavailable in sandboxed CI environments.
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("discuss"));
        assert!(path_str.ends_with("config.toml"));
    }
}
