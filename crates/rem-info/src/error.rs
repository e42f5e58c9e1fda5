//! Error types for rem-info

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rem-info operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rem-info operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server answered with a non-success status
    #[error("HTTP request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded for URL: {0}")]
    RateLimitExceeded(String),

    /// A metrics table could not be read
    #[error("Failed to read metrics table {path}: {source}")]
    Io {
        /// Table location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A metrics table is not a valid `name -> record` JSON object
    #[error("Invalid metrics table {path}: {source}")]
    InvalidTable {
        /// Table location
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A metrics table holds scores outside `[0, 1]`
    #[error("Invalid metrics table: {0}")]
    InvalidScores(#[from] rem_core::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the server rejected this particular request.
    ///
    /// Rate limiting is not a rejection: a smaller batch would be refused too
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Status { .. })
    }
}
