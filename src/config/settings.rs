//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Longest request timeout accepted from the configuration file.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// How the server process is launched.
    #[serde(default)]
    pub server: ServerConfig,

    /// Protocol session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.interpreter.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "server.interpreter cannot be empty".to_string(),
            });
        }

        let timeout = self.session.request_timeout_secs;
        if timeout == 0 || timeout > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid session.request_timeout_secs {timeout}. Must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}"
                ),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// Server launch configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Interpreter used to run the server script.
    /// Default: "python"
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Extra arguments passed after the script path.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides for the server process.
    /// Absent means the server inherits the client's environment unchanged.
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            args: Vec::new(),
            env: None,
        }
    }
}

fn default_interpreter() -> String {
    "python".to_string()
}

/// Protocol session configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Name reported to the server in `clientInfo`.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Per-request timeout in seconds (handshake included).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SessionConfig {
    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_client_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
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

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.interpreter, "python");
        assert!(config.server.env.is_none());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": {
                "interpreter": "python3",
                "args": ["--verbose"],
                "env": { "SERVER_MODE": "test" }
            },
            "session": {
                "client_name": "integration-client",
                "request_timeout_secs": 5
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.interpreter, "python3");
        assert_eq!(config.server.args, vec!["--verbose".to_string()]);
        assert_eq!(
            config
                .server
                .env
                .as_ref()
                .and_then(|env| env.get("SERVER_MODE")),
            Some(&"test".to_string())
        );
        assert_eq!(config.session.client_name, "integration-client");
        assert_eq!(config.session.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.client_name, "mcp-client");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_empty_interpreter() {
        let json = r#"{ "server": { "interpreter": "  " } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_timeout() {
        let json = r#"{ "session": { "request_timeout_secs": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_log_level() {
        let json = r#"{ "logging": { "level": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
