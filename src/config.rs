//! Run configuration.
//!
//! Values come from, in increasing priority: built-in defaults, the
//! `VPROV_ENDPOINT` environment variable, an optional JSON config file, and
//! command-line flags.
use crate::namespace::StateFileNamespace;
use crate::retry::RetryPolicy;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Environment variable naming a remote namespace endpoint.
pub const ENDPOINT_ENV: &str = "VPROV_ENDPOINT";

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        default_config()
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub poll_interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub endpoint: Option<String>,
    pub state_path: Option<PathBuf>,
}

/// Where views are provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    Endpoint(String),
    StateFile(PathBuf),
}

pub fn default_config() -> RunConfig {
    RunConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        timeout_ms: DEFAULT_TIMEOUT_MS,
        endpoint: None,
        state_path: None,
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: RunConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Layer config file, environment, and flags into one validated config.
pub fn resolve_config(
    config_path: Option<&Path>,
    env_endpoint: Option<String>,
    overrides: &ConfigOverrides,
) -> Result<RunConfig> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    if config.endpoint.is_none() && config.state_path.is_none() {
        config.endpoint = env_endpoint.filter(|value| !value.trim().is_empty());
    }
    if let Some(interval) = overrides.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    if let Some(timeout) = overrides.timeout_ms {
        config.timeout_ms = timeout;
    }
    if let Some(endpoint) = &overrides.endpoint {
        config.endpoint = Some(endpoint.clone());
        config.state_path = None;
    }
    if let Some(state_path) = &overrides.state_path {
        config.state_path = Some(state_path.clone());
        config.endpoint = None;
    }
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.poll_interval_ms == 0 {
        return Err(anyhow!("poll_interval_ms must be greater than zero"));
    }
    if config.timeout_ms < config.poll_interval_ms {
        return Err(anyhow!(
            "timeout_ms ({}) must be at least poll_interval_ms ({})",
            config.timeout_ms,
            config.poll_interval_ms
        ));
    }
    if config.endpoint.is_some() && config.state_path.is_some() {
        return Err(anyhow!("endpoint and state_path are mutually exclusive"));
    }
    if let Some(endpoint) = config.endpoint.as_deref() {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(anyhow!(
                "endpoint must be an http:// or https:// URL (got {endpoint:?})"
            ));
        }
    }
    Ok(())
}

impl RunConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    /// Backend to provision against, falling back to the default state file.
    pub fn backend_target(&self) -> Result<BackendTarget> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(BackendTarget::Endpoint(endpoint.clone()));
        }
        let path = match &self.state_path {
            Some(path) => path.clone(),
            None => StateFileNamespace::default_path()
                .ok_or_else(|| anyhow!("no data directory; pass --state <FILE>"))?,
        };
        Ok(BackendTarget::StateFile(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_poll_every_100ms_for_a_minute() {
        let config = default_config();
        validate_config(&config).expect("defaults are valid");
        let policy = config.retry_policy();
        assert_eq!(policy.interval, Duration::from_millis(100));
        assert_eq!(policy.timeout, Duration::from_secs(60));
    }

    #[test]
    fn config_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("vprov.json");
        fs::write(&path, r#"{"timeout_ms": 5000}"#).expect("write config");
        let config = load_config(&path).expect("load");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.schema_version, CONFIG_SCHEMA_VERSION);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("vprov.json");
        fs::write(&path, r#"{"timout_ms": 5000}"#).expect("write config");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn flags_beat_file_and_env() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("vprov.json");
        fs::write(&path, r#"{"endpoint": "http://file.example", "timeout_ms": 5000}"#)
            .expect("write config");
        let overrides = ConfigOverrides {
            timeout_ms: Some(1000),
            state_path: Some(PathBuf::from("/tmp/state.json")),
            ..ConfigOverrides::default()
        };
        let config = resolve_config(
            Some(&path),
            Some("http://env.example".to_string()),
            &overrides,
        )
        .expect("resolve");
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.endpoint, None);
        assert_eq!(
            config.backend_target().expect("target"),
            BackendTarget::StateFile(PathBuf::from("/tmp/state.json"))
        );
    }

    #[test]
    fn env_endpoint_applies_only_without_file_backend() {
        let config = resolve_config(
            None,
            Some("https://env.example".to_string()),
            &ConfigOverrides::default(),
        )
        .expect("resolve");
        assert_eq!(
            config.backend_target().expect("target"),
            BackendTarget::Endpoint("https://env.example".to_string())
        );
    }

    #[test]
    fn rejects_bad_timing_and_endpoint() {
        let mut config = default_config();
        config.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = default_config();
        config.timeout_ms = 10;
        assert!(validate_config(&config).is_err());

        let mut config = default_config();
        config.endpoint = Some("ftp://views".to_string());
        assert!(validate_config(&config).is_err());

        let mut config = default_config();
        config.endpoint = Some("http://views".to_string());
        config.state_path = Some(PathBuf::from("state.json"));
        assert!(validate_config(&config).is_err());
    }
}
