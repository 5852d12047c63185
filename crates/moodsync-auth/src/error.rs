//! Error types for credential storage and refresh

/// Errors from credential operations.
///
/// `Clone` because a single refresh outcome is handed to every caller that
/// joined the in-flight exchange.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("token store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
