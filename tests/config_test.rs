//! Config loading and defaults integration tests

use std::path::PathBuf;

use gym_sync::{Config, ConfigError};
use tempfile::TempDir;

#[test]
fn test_config_with_all_fields() {
    let toml_str = r#"
[client]
user_id = "member-42"
data_dir = "/var/lib/gym-sync"

[remote]
base_url = "https://api.example-gym.com/v1/documents"
auth_token = "secret-token"
timeout_secs = 3

[sync]
collection = "workout_sets"
overflow_capacity = 16

[connectivity]
probe_url = "https://api.example-gym.com/health"
probe_interval_ms = 2000
"#;

    let config = Config::from_toml(toml_str).expect("valid config");

    assert_eq!(config.client.user_id, "member-42");
    assert_eq!(config.client.data_dir, PathBuf::from("/var/lib/gym-sync"));
    assert_eq!(config.remote.auth_token.as_deref(), Some("secret-token"));
    assert_eq!(config.remote_timeout().as_secs(), 3);
    assert_eq!(config.sync.collection, "workout_sets");
    assert_eq!(config.sync.overflow_capacity, 16);
    assert_eq!(config.probe_interval().as_millis(), 2000);
}

#[test]
fn test_partial_sections_fill_defaults() {
    let toml_str = r#"
[sync]
collection = "sets"
"#;

    let config = Config::from_toml(toml_str).unwrap();
    assert_eq!(config.sync.collection, "sets");
    assert_eq!(config.sync.overflow_capacity, 256);
    assert_eq!(config.remote.timeout_secs, 10);
    assert_eq!(config.client.data_dir, PathBuf::from("./gym-sync-data"));
}

#[test]
fn test_empty_collection_rejected() {
    let err = Config::from_toml("[sync]\ncollection = \"  \"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let err = Config::from_toml("[sync\ncollection = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gym-sync.toml");
    std::fs::write(&path, "[client]\nuser_id = \"from-file\"\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.client.user_id, "from-file");
}
