//! Configuration management for the CLI
//!
//! Settings are merged from, lowest precedence first:
//! - library defaults
//! - a configuration file (TOML or JSON)
//! - environment variables and command-line flags (resolved by clap)

use crate::cli::ConnectionArgs;
use crate::error::{Error, Result};
use ai_spine_core::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the AI Spine API
    pub base_url: Option<String>,

    /// API key; prefer the environment for shared machines
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout: Option<u64>,

    /// Maximum retries for transient failures
    pub max_retries: Option<u32>,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// Logging section of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter, e.g. `info` or `ai_spine_core=debug`
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,
}

impl Config {
    /// Load configuration from a file, choosing the parser by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let invalid = |message: String| Error::ConfigFile {
            path: path.to_path_buf(),
            message,
        };

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| invalid(e.to_string()))
        }
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".ai-spine.toml"), PathBuf::from(".ai-spine.json")];

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("ai-spine");
            paths.push(dir.join("config.toml"));
            paths.push(dir.join("config.json"));
        }

        paths
    }

    /// Merge with command-line and environment overrides (they take precedence)
    pub fn merge(&mut self, overrides: &ConnectionArgs) {
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url.clone();
        }
        if overrides.api_key.is_some() {
            self.api_key = overrides.api_key.clone();
        }
        if overrides.timeout.is_some() {
            self.timeout = overrides.timeout;
        }
        if overrides.max_retries.is_some() {
            self.max_retries = overrides.max_retries;
        }
    }

    /// Build the validated client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder();
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }
        Ok(builder.build()?)
    }
}
