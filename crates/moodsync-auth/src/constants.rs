//! Backend auth constants

/// Refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "auth/refresh";

/// Seconds before `exp` at which an access token is already treated as expired
pub const DEFAULT_EXPIRY_SKEW_SECS: u64 = 30;

/// File name of the persisted credential pair inside the client data directory
pub const TOKEN_FILE: &str = "tokens.json";
