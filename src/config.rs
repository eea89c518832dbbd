//! Configuration management for the Notescribe backend
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{NotescribeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for the Notescribe backend
///
/// This structure holds all configuration needed by the service,
/// including HTTP server settings, provider settings, workspace
/// settings, and log shipping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Workspace configuration
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Log queue and shipper configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the server on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use for generation
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API key for the Gemini API
    ///
    /// Usually supplied through the `GEMINI_API_KEY` environment variable
    /// rather than the config file. When absent, operations that need the
    /// provider report missing credentials (title generation falls back).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional API base URL (useful for tests and local mocks)
    ///
    /// When set, this base is used to build generation endpoints
    /// (e.g. `/v1beta/models/{model}:generateContent`), which allows
    /// tests to point the provider at a mock server.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_key: None,
            api_base: None,
        }
    }
}

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Initial workspace root directory
    ///
    /// May be changed at runtime via `POST /api/workspace/set`; the last
    /// selected directory is persisted to `state_file` and wins over this
    /// value on restart.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Path of the JSON state file holding `{ "last_directory": ... }`
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".notescribe/workspace.json")
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            state_file: default_state_file(),
        }
    }
}

/// Log queue and shipper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// URL of the remote log collector
    #[serde(default = "default_collector_url")]
    pub collector_url: String,

    /// Directory for the local NDJSON log files
    #[serde(default = "default_log_dir")]
    pub file_dir: PathBuf,

    /// Capacity of the bounded log queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Delivery timeout per record, in milliseconds
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
}

fn default_collector_url() -> String {
    "http://localhost:9999/log".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_delivery_timeout_ms() -> u64 {
    1000
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            collector_url: default_collector_url(),
            file_dir: default_log_dir(),
            queue_capacity: default_queue_capacity(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a file with env and CLI overrides applied
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML config file
    /// * `cli` - Parsed CLI arguments whose overrides take precedence
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NotescribeError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| NotescribeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.provider.gemini.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("NOTESCRIBE_LOG_COLLECTOR") {
            if !url.trim().is_empty() {
                self.logging.collector_url = url;
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(workspace) = &cli.workspace {
            self.workspace.root = Some(workspace.clone());
        }
        if let Some(collector) = &cli.collector_url {
            self.logging.collector_url = collector.clone();
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.gemini.model.is_empty() {
            return Err(NotescribeError::Config("model cannot be empty".to_string()).into());
        }

        if self.logging.queue_capacity == 0 {
            return Err(NotescribeError::Config(
                "queue_capacity must be greater than 0".to_string(),
            )
            .into());
        }

        if self.logging.delivery_timeout_ms == 0 {
            return Err(NotescribeError::Config(
                "delivery_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        url::Url::parse(&self.logging.collector_url).map_err(|e| {
            NotescribeError::Config(format!(
                "collector_url is not a valid URL: {}: {}",
                self.logging.collector_url, e
            ))
        })?;

        if let Some(base) = &self.provider.gemini.api_base {
            url::Url::parse(base).map_err(|e| {
                NotescribeError::Config(format!("api_base is not a valid URL: {}: {}", base, e))
            })?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            workspace: WorkspaceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8001);
    }

    #[test]
    fn test_default_gemini_config() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert!(config.api_key.is_none());
        assert!(config.api_base.is_none());
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.collector_url, "http://localhost:9999/log");
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.delivery_timeout_ms, 1000);
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = "server:\n  port: 9001\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.provider.gemini.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
server:
  host: 0.0.0.0
  port: 8080
provider:
  gemini:
    model: gemini-2.0-pro
    api_base: http://localhost:4010
workspace:
  root: /tmp/notes
logging:
  collector_url: http://localhost:9999/log
  queue_capacity: 64
  delivery_timeout_ms: 500
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider.gemini.model, "gemini-2.0-pro");
        assert_eq!(
            config.provider.gemini.api_base.as_deref(),
            Some("http://localhost:4010")
        );
        assert_eq!(config.workspace.root, Some(PathBuf::from("/tmp/notes")));
        assert_eq!(config.logging.queue_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = Config::default();
        config.provider.gemini.model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_queue_capacity() {
        let mut config = Config::default();
        config.logging.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_collector_url() {
        let mut config = Config::default();
        config.logging.collector_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let cli = crate::cli::Cli {
            config: None,
            port: Some(9999),
            workspace: Some(PathBuf::from("/tmp/ws")),
            collector_url: Some("http://localhost:7000/log".to_string()),
            verbose: false,
        };
        let mut config = Config::default();
        config.apply_cli_overrides(&cli);
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.workspace.root, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(config.logging.collector_url, "http://localhost:7000/log");
    }
}
