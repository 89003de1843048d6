//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

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

    /// HTTP/SSE transport settings.
    #[serde(default)]
    pub server: ServerConfig,

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
        for (field, path) in [
            ("server.sse_path", &self.server.sse_path),
            ("server.message_path", &self.server.message_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError {
                    message: format!("{field} must start with '/', got '{path}'"),
                });
            }
        }

        if self.server.sse_path == self.server.message_path {
            return Err(ConfigError::ValidationError {
                message: "server.sse_path and server.message_path must differ".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP/SSE transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the SSE transport binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Port the SSE transport listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the SSE stream endpoint.
    #[serde(default = "default_sse_path")]
    pub sse_path: String,

    /// Path of the message submit endpoint, advertised via the endpoint event.
    #[serde(default = "default_message_path")]
    pub message_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            sse_path: default_sse_path(),
            message_path: default_message_path(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

fn default_sse_path() -> String {
    crate::mcp::sse::DEFAULT_SSE_PATH.to_string()
}

fn default_message_path() -> String {
    crate::mcp::sse::DEFAULT_MESSAGE_PATH.to_string()
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
