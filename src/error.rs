//! Error types for toolbox-mcp.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors produced by tool handlers.
///
/// The protocol core maps each variant to its JSON-RPC error category:
/// `InvalidArguments` becomes `-32602` (invalid params) and `Execution`
/// becomes `-32603` (tool execution error).
#[derive(Error, Debug)]
pub enum ToolError {
    /// The argument bag did not match the tool's expected shape.
    #[error("{0}")]
    InvalidArguments(String),

    /// The tool failed while executing with well-formed arguments.
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    /// Wraps a serde deserialisation failure of the argument bag.
    #[must_use]
    pub fn bad_arguments(err: &serde_json::Error) -> Self {
        Self::InvalidArguments(format!("invalid arguments: {err}"))
    }
}
