//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Relay tunables: queue sizing and the keepalive protocol
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Slots in each client's outbound queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Largest inbound message accepted, in bytes
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Seconds a client may stay silent before it is dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Seconds between keepalive pings; must stay below the idle timeout
    #[serde(default = "default_ping_period")]
    pub ping_period_secs: u64,

    /// Seconds allowed for a single socket write
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_message_bytes() -> usize {
    512
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_ping_period() -> u64 {
    5
}

fn default_write_timeout() -> u64 {
    5
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_message_bytes: default_max_message_bytes(),
            idle_timeout_secs: default_idle_timeout(),
            ping_period_secs: default_ping_period(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("relay").join("config.toml")),
            Some(PathBuf::from("/etc/relay/config.toml")),
            Some(PathBuf::from("./relay.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("RELAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject settings the relay cannot run with
    ///
    /// The ping period must be strictly shorter than the idle timeout:
    /// otherwise a silent-but-alive peer can be dropped before the first
    /// ping gives it a chance to answer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "relay.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.relay.max_message_bytes == 0 {
            return Err(ConfigError::Invalid(
                "relay.max_message_bytes must be at least 1".to_string(),
            ));
        }
        if self.relay.ping_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "relay.ping_period_secs must be at least 1".to_string(),
            ));
        }
        if self.relay.ping_period_secs >= self.relay.idle_timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "relay.ping_period_secs ({}) must be shorter than relay.idle_timeout_secs ({})",
                self.relay.ping_period_secs, self.relay.idle_timeout_secs
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.relay.queue_capacity, 256);
        assert_eq!(config.relay.max_message_bytes, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[relay]
queue_capacity = 16
idle_timeout_secs = 10
ping_period_secs = 3

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.relay.queue_capacity, 16);
        assert_eq!(config.relay.idle_timeout_secs, 10);
        // Unset fields keep their defaults.
        assert_eq!(config.relay.write_timeout_secs, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server\nhost =").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_rejects_ping_period_at_or_above_idle_timeout() {
        let mut config = Config::default();
        config.relay.idle_timeout_secs = 5;
        config.relay.ping_period_secs = 5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.relay.ping_period_secs = 6;
        assert!(config.validate().is_err());

        config.relay.ping_period_secs = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.relay.queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
