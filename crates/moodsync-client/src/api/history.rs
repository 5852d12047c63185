//! Session history, paged by cursor.

use crate::client::{ApiClient, RequestOptions};
use crate::error::{Error, Result};
use crate::types::{SessionDetail, SessionHistory};

/// Page size used when the caller has no preference.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// History API client.
pub struct HistoryApi {
    client: ApiClient,
}

impl HistoryApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of past sessions, newest first. Pass the previous page's
    /// `next_cursor` to continue.
    pub async fn list(&self, limit: u32, cursor: Option<&str>) -> Result<SessionHistory> {
        let mut options = RequestOptions::get().query("limit", limit.to_string());
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            options = options.query("cursor", cursor);
        }
        self.client
            .get_json(
                "sessions/history",
                options,
                "Failed to load session history",
            )
            .await
    }

    /// Full record for one session.
    ///
    /// Ids that would resolve as relative path segments (`.`, `..`, empty)
    /// are rejected without a request.
    pub async fn detail(&self, session_id: &str) -> Result<SessionDetail> {
        if session_id.chars().all(|c| c == '.') {
            return Err(Error::InvalidInput(format!(
                "session id {session_id:?} is not a valid path segment"
            )));
        }
        let path = format!("sessions/{}", urlencoding::encode(session_id));
        self.client
            .get_json(&path, RequestOptions::get(), "Failed to load session detail")
            .await
    }
}
