//! Configuration module for the status server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::codec::DEFAULT_MAX_REQUEST_LEN;
use crate::protocol::HandlerSettings;
use crate::status::StatusCode;

/// Command-line arguments for the status server
#[derive(Parser, Debug)]
#[command(name = "status-beacon")]
#[command(author = "status-beacon authors")]
#[command(version = "0.1.0")]
#[command(about = "A line-oriented TCP status server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:7070)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Number of connection workers (values below 1 are treated as 1)
    #[arg(short = 'w', long, allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Read deadline per connection in milliseconds
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Seed entries for the status table, identifier to status
    #[serde(default)]
    pub statuses: HashMap<String, StatusCode>,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of connection workers
    #[serde(default = "default_workers")]
    pub workers: i64,
    /// Listen backlog for connections waiting on a free worker
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    /// Read deadline per connection in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Maximum request length in bytes, terminator included
    #[serde(default = "default_max_request_len")]
    pub max_request_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: default_workers(),
            backlog: default_backlog(),
            read_timeout_ms: default_read_timeout_ms(),
            max_request_len: default_max_request_len(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:7070".to_string()
}

fn default_workers() -> i64 {
    64
}

fn default_backlog() -> i32 {
    1024
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_max_request_len() -> usize {
    DEFAULT_MAX_REQUEST_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    /// As configured; see [`crate::pool::effective_workers`].
    pub workers: i64,
    pub backlog: i32,
    pub read_timeout: Duration,
    pub max_request_len: usize,
    pub log_level: String,
    pub statuses: HashMap<String, StatusCode>,
}

impl Default for Config {
    fn default() -> Self {
        Config::merge(CliArgs::empty(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = match cli.config {
            Some(ref config_path) => TomlConfig::from_file(config_path)?,
            None => TomlConfig::default(),
        };

        Ok(Config::merge(cli, toml_config))
    }

    /// Merge CLI args over TOML config
    pub fn merge(cli: CliArgs, file: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(file.server.listen),
            workers: cli.workers.unwrap_or(file.server.workers),
            backlog: file.server.backlog,
            read_timeout: Duration::from_millis(
                cli.read_timeout_ms.unwrap_or(file.server.read_timeout_ms),
            ),
            max_request_len: file.server.max_request_len,
            log_level: cli.log_level.unwrap_or(file.logging.level),
            statuses: file.statuses,
        }
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            read_timeout: self.read_timeout,
            max_request_len: self.max_request_len,
        }
    }
}

impl CliArgs {
    fn empty() -> Self {
        CliArgs {
            config: None,
            listen: None,
            workers: None,
            read_timeout_ms: None,
            log_level: None,
        }
    }
}

impl TomlConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen, "127.0.0.1:7070");
        assert_eq!(config.workers, 64);
        assert_eq!(config.backlog, 1024);
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.max_request_len, 4096);
        assert_eq!(config.log_level, "info");
        assert!(config.statuses.is_empty());
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:7070"
            workers = 8
            backlog = 256
            read_timeout_ms = 2500
            max_request_len = 512

            [logging]
            level = "debug"

            [statuses]
            probe-1 = "up"
            probe-2 = "jeopardy"
            probe-3 = 15
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:7070");
        assert_eq!(config.server.workers, 8);
        assert_eq!(config.server.backlog, 256);
        assert_eq!(config.server.read_timeout_ms, 2500);
        assert_eq!(config.server.max_request_len, 512);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.statuses["probe-1"], StatusCode::Up);
        assert_eq!(config.statuses["probe-2"], StatusCode::Jeopardy);
        assert_eq!(config.statuses["probe-3"], StatusCode::Maintenance);
    }

    #[test]
    fn test_invalid_status_rejected() {
        let toml_str = r#"
            [statuses]
            probe-1 = 42
        "#;
        assert!(toml::from_str::<TomlConfig>(toml_str).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = CliArgs::try_parse_from([
            "status-beacon",
            "--listen",
            "127.0.0.1:9000",
            "--workers",
            "-3",
            "--read-timeout-ms",
            "100",
        ])
        .unwrap();
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:7070"
            workers = 8

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let config = Config::merge(cli, file);
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.workers, -3);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.handler_settings().read_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_missing_file() {
        let err = TomlConfig::from_file(Path::new("/nonexistent/status-beacon.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
