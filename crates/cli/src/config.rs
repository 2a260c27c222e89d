// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scanner configuration management.
//!
//! Configuration is stored in `.stocktake/config.toml` and includes:
//! - `operator`: default actor recorded on scans
//! - `[remote]`: the WebSocket remote store and its timeouts
//! - `[sync]`: auto-sync period, retry budget and probe period

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sync::SyncConfig;

const WORK_DIR_NAME: &str = ".stocktake";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "mirror.db";

/// Scanner configuration stored in `.stocktake/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default actor for scans. Falls back to `scanner` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Remote store (optional - without it the scanner only queues).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Remote store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL: `ws://...` or `wss://...`.
    pub url: String,
    /// Max time to wait for a connection in seconds (default: 2).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Max time for a single remote call in milliseconds (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Drain scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Auto-sync period in seconds (default: 30).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Failed attempts allowed before a mutation is dropped (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Connectivity probe period in seconds (default: 10).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_interval_secs(),
            max_retries: default_max_retries(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_interval_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_probe_interval_secs() -> u64 {
    10
}

impl RemoteConfig {
    /// Creates a remote config with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        RemoteConfig {
            url: url.into(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    /// Validates that the URL is a WebSocket URL.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let rest = self
            .url
            .strip_prefix("ws://")
            .or_else(|| self.url.strip_prefix("wss://"));
        match rest {
            Some(host) if !host.is_empty() => None,
            Some(_) => Some(format!("invalid remote URL '{}': missing host", self.url)),
            None => Some(format!(
                "invalid remote URL '{}': must start with ws:// or wss://",
                self.url
            )),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Loads configuration from the given `.stocktake/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if let Some(message) = config.validate() {
            return Err(Error::Config(message));
        }
        Ok(config)
    }

    /// Checks the remote URL and that every period, timeout and budget is non-zero.
    ///
    /// Returns an error message if a value is unusable.
    pub fn validate(&self) -> Option<String> {
        if let Some(remote) = &self.remote {
            if let Some(message) = remote.validate_url() {
                return Some(message);
            }
            if remote.connect_timeout_secs == 0 {
                return Some("remote.connect_timeout_secs must be at least 1".to_string());
            }
            if remote.request_timeout_ms == 0 {
                return Some("remote.request_timeout_ms must be at least 1".to_string());
            }
        }
        if self.sync.interval_secs == 0 {
            return Some("sync.interval_secs must be at least 1".to_string());
        }
        if self.sync.max_retries == 0 {
            return Some("sync.max_retries must be at least 1".to_string());
        }
        if self.sync.probe_interval_secs == 0 {
            return Some("sync.probe_interval_secs must be at least 1".to_string());
        }
        None
    }

    /// Saves configuration to the given `.stocktake/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Returns the remote config, or [`Error::NoRemote`].
    pub fn require_remote(&self) -> Result<&RemoteConfig> {
        self.remote.as_ref().ok_or(Error::NoRemote)
    }

    /// Resolves the actor for a scan: explicit flag, `STK_OPERATOR`, config, then `scanner`.
    pub fn actor(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(crate::env::operator)
            .or_else(|| self.operator.clone())
            .unwrap_or_else(|| "scanner".to_string())
    }

    /// Converts the settings into runtime sync configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let mut sync = SyncConfig {
            interval: Duration::from_secs(self.sync.interval_secs),
            max_retries: self.sync.max_retries,
            ..SyncConfig::default()
        };
        if let Some(remote) = &self.remote {
            sync.remote_timeout = remote.request_timeout();
        }
        sync
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.sync.probe_interval_secs)
    }
}

/// Find the .stocktake directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

/// Get the local mirror database path.
pub fn get_db_path(work_dir: &Path) -> PathBuf {
    work_dir.join(DB_FILE_NAME)
}

/// Initialize a new .stocktake directory at the given path
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }
    if let Some(message) = config.remote.as_ref().and_then(RemoteConfig::validate_url) {
        return Err(Error::InvalidRemoteUrl(message));
    }

    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;

    Ok(work_dir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
