//! Configuration.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PROMPTQ_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/promptq/config.toml
//!   3. ~/.config/promptq/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::LeaseBounds;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptqConfig {
    pub server: ServerConfig,
    pub lease: LeaseBounds,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for the HTTP API.
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent worker loops.
    pub concurrency: usize,
    /// Lease requested per prompt.
    pub lease_secs: u64,
    /// Sleep between polls when the queue is empty.
    pub idle_backoff_ms: u64,
    /// Base URL of the server the CLI talks to.
    pub server_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            lease_secs: 120,
            idle_backoff_ms: 500,
            server_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid lease bounds: min={min} default={default} max={max}")]
    InvalidLeaseBounds { min: u64, default: u64, max: u64 },
    #[error("worker.concurrency must be at least 1")]
    ZeroConcurrency,
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl PromptqConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Self::file_path(), |name| std::env::var(name).ok())
    }

    /// Load from `path` (defaults when it does not exist), then apply overrides from `env`.
    pub fn load_with(
        path: impl AsRef<Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            PromptqConfig::default()
        };
        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PROMPTQ_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply PROMPTQ_* overrides. Unparsable numbers are ignored.
    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("PROMPTQ_SERVER__BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env("PROMPTQ_LEASE__MIN_SECS").and_then(|v| v.parse().ok()) {
            self.lease.min_secs = v;
        }
        if let Some(v) = env("PROMPTQ_LEASE__MAX_SECS").and_then(|v| v.parse().ok()) {
            self.lease.max_secs = v;
        }
        if let Some(v) = env("PROMPTQ_LEASE__DEFAULT_SECS").and_then(|v| v.parse().ok()) {
            self.lease.default_secs = v;
        }
        if let Some(v) = env("PROMPTQ_WORKER__CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.worker.concurrency = v;
        }
        if let Some(v) = env("PROMPTQ_WORKER__SERVER_URL") {
            self.worker.server_url = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lease.is_consistent() {
            return Err(ConfigError::InvalidLeaseBounds {
                min: self.lease.min_secs,
                default: self.lease.default_secs,
                max: self.lease.max_secs,
            });
        }
        if self.worker.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join("promptq")
}
