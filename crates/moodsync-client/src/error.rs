//! Client error types

use thiserror::Error;

/// Errors surfaced to feature code.
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal non-2xx response from the backend.
    #[error("{message} (HTTP {status})")]
    RequestFailed { message: String, status: u16 },

    /// Connection-level failure; passed through unclassified.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token storage or refresh failure.
    #[error("auth error: {0}")]
    Auth(#[from] moodsync_auth::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied value rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// HTTP status of a `RequestFailed`.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
