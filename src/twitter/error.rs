//! Error types for the X API client.

use thiserror::Error;

/// Errors returned by [`crate::twitter::TwitterApi`] implementations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The HTTP request itself failed (connection, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The X API answered with a non-success status.
    #[error("X API error ({status}): {message}")]
    Status {
        /// HTTP status code. 429 signals an exhausted quota window.
        status: u16,
        /// Error detail extracted from the response body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from X API: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Malformed(_) => None,
        }
    }

    /// Whether this error is the remote's "too many requests" signal.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(429)
    }
}
