//! Configuration Management
//!
//! Handles persistent configuration storage for cloudprov.

use crate::api::auth::TOKEN_ENV_VAR;
use crate::api::limiter::DEFAULT_RATE_LIMIT;
use crate::api::poller::{
    DEFAULT_MAX_POLL_INTERVAL, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, DEFAULT_STATUS_FIELD,
};
use crate::api::{Credentials, GatewayOptions, PollOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the API base URL
pub const API_URL_ENV_VAR: &str = "CLOUDPROV_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.example.com/v1/";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the cloud API
    pub api_url: Option<String>,
    /// API token; `CLOUDPROV_TOKEN` takes precedence
    pub token: Option<String>,
    /// Calls per second through the gateway
    pub rate_limit: f64,
    pub burst: u32,
    pub poll_interval_ms: u64,
    pub poll_max_interval_ms: u64,
    pub poll_timeout_secs: u64,
    /// Response field carrying the resource status
    pub status_field: String,
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            burst: 1,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            poll_max_interval_ms: DEFAULT_MAX_POLL_INTERVAL.as_millis() as u64,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT.as_secs(),
            status_field: DEFAULT_STATUS_FIELD.to_string(),
            user_agent: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudprov").join("config.yaml"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective API URL (env > config > default)
    pub fn effective_api_url(&self) -> String {
        std::env::var(API_URL_ENV_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Get effective credentials (env > config)
    pub fn credentials(&self) -> Option<Credentials> {
        let from_env = std::env::var(TOKEN_ENV_VAR)
            .map(|token| !token.trim().is_empty())
            .unwrap_or(false);
        if from_env {
            return Some(Credentials::from_env(TOKEN_ENV_VAR));
        }
        self.token.as_deref().map(Credentials::from_token)
    }

    /// Set API URL and save, to `path` or the default location
    pub fn set_api_url(&mut self, api_url: &str, path: Option<&Path>) -> Result<()> {
        self.api_url = Some(api_url.to_string());
        match path {
            Some(path) => self.save_to(path),
            None => self.save(),
        }
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        let defaults = GatewayOptions::default();
        GatewayOptions {
            base_url: self.effective_api_url(),
            rate_limit: self.rate_limit,
            burst: self.burst,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            request_timeout: defaults.request_timeout,
        }
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            timeout: Duration::from_secs(self.poll_timeout_secs),
            interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
            status_field: self.status_field.clone(),
        }
    }
}
