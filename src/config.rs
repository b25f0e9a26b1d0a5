//! Configuration management for DSA Assistant
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base address used when nothing else configures one
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Upper bound accepted for any request timeout (seconds)
const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Main configuration structure for DSA Assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Session storage settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend API configuration
///
/// The base URL is the only knob the backend contract needs; the timeouts
/// bound every request the client layer issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address of the study assistant backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for auth and revise requests (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Timeout for chat sends (seconds); answer generation is slower
    #[serde(default = "default_chat_timeout_seconds")]
    pub chat_timeout_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_chat_timeout_seconds() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            chat_timeout_seconds: default_chat_timeout_seconds(),
        }
    }
}

impl ApiConfig {
    /// Timeout applied to auth and revise requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Timeout applied to chat sends
    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_seconds)
    }
}

/// Session storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of a session file; the OS keyring is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Where the session is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLocation {
    /// OS credential store (Keychain, Secret Service, Credential Manager)
    Keyring,
    /// Owner-only JSON file at the given path
    File(PathBuf),
}

impl std::fmt::Display for SessionLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyring => write!(f, "system keyring"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl SessionConfig {
    /// Resolve where the session lives
    pub fn location(&self) -> SessionLocation {
        match &self.path {
            Some(path) => SessionLocation::File(path.clone()),
            None => SessionLocation::Keyring,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AssistantError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AssistantError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("DSA_ASSISTANT_API_URL") {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }

        if let Ok(timeout) = std::env::var("DSA_ASSISTANT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid DSA_ASSISTANT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("DSA_ASSISTANT_CHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.chat_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid DSA_ASSISTANT_CHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(path) = std::env::var("DSA_ASSISTANT_SESSION_PATH") {
            if !path.trim().is_empty() {
                self.session.path = Some(PathBuf::from(path));
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.api_url {
            tracing::debug!("Using API URL override from CLI: {}", url);
            self.api.base_url = url.clone();
        }
        if let Some(path) = &cli.session_path {
            self.session.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an http(s) URL or a timeout is
    /// out of range
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            AssistantError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AssistantError::Config(format!(
                "api.base_url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        for (name, value) in [
            ("api.timeout_seconds", self.api.timeout_seconds),
            ("api.chat_timeout_seconds", self.api.chat_timeout_seconds),
        ] {
            if value == 0 {
                return Err(
                    AssistantError::Config(format!("{} must be greater than 0", name)).into(),
                );
            }
            if value > MAX_TIMEOUT_SECONDS {
                return Err(AssistantError::Config(format!(
                    "{} must be less than or equal to {}",
                    name, MAX_TIMEOUT_SECONDS
                ))
                .into());
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
