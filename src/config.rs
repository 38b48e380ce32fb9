//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Member the CLI records writes for when `--user` is not given
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Directory holding the local queue database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the document store; collections are appended as a path segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every write (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote collection training records are written to
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Records held in memory when the local queue rejects an append
    #[serde(default = "default_overflow_capacity")]
    pub overflow_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// URL probed to decide whether the device is online
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Probe interval in milliseconds
    #[serde(default = "default_probe_interval")]
    pub probe_interval_ms: u64,
}

// Defaults
fn default_user_id() -> String { "member-1".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from("./gym-sync-data") }
fn default_base_url() -> String { "http://localhost:8080/v1/documents".to_string() }
fn default_timeout_secs() -> u64 { 10 }
fn default_collection() -> String { "training_records".to_string() }
fn default_overflow_capacity() -> usize { 256 }
fn default_probe_url() -> String { "http://localhost:8080/health".to_string() }
fn default_probe_interval() -> u64 { 5000 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            overflow_capacity: default_overflow_capacity(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: default_probe_url(),
            probe_interval_ms: default_probe_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            remote: RemoteConfig::default(),
            sync: SyncConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("sync.collection must not be empty".into()));
        }
        if self.remote.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("remote.base_url must not be empty".into()));
        }
        if self.connectivity.probe_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "connectivity.probe_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_interval_ms)
    }
}
