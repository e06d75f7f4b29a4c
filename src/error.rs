//! Error types for twitter-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include credentials.
//! Remote failures carry the X API's own error detail, which does not
//! echo authentication material back.

use std::path::PathBuf;

use thiserror::Error;

use crate::media::MediaError;
use crate::rate_limit::ThrottleError;

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

/// Errors surfaced by the action dispatcher.
///
/// Each variant maps onto one JSON-RPC error class at the server boundary:
/// bad arguments, failed validation and exhausted rate limits are
/// invalid-request; unknown tool names are method-not-found; anything else
/// (network failure, malformed remote response, auth failure) is
/// internal-error.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Bad arguments, a failed pre-flight validation, or a rate-limit hit.
    #[error("{0}")]
    InvalidRequest(String),

    /// The invocation named a tool this server does not provide.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Unexpected remote or client failure.
    #[error("{0}")]
    Internal(String),
}

impl From<MediaError> for ToolError {
    fn from(err: MediaError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<ThrottleError> for ToolError {
    fn from(err: ThrottleError) -> Self {
        match err {
            ThrottleError::RateLimited { .. } => Self::InvalidRequest(err.to_string()),
            ThrottleError::Api(api) => Self::Internal(api.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn unknown_tool_display() {
        let error = ToolError::UnknownTool("post_toot".to_string());
        assert_eq!(error.to_string(), "Unknown tool: post_toot");
    }

    #[test]
    fn media_error_maps_to_invalid_request() {
        let error = ToolError::from(MediaError::NotFound {
            path: PathBuf::from("/tmp/missing.png"),
        });
        let ToolError::InvalidRequest(msg) = error else {
            panic!("Expected InvalidRequest");
        };
        assert!(msg.contains("missing.png"));
    }
}
