//! Work session logging.

use crate::client::{ApiClient, RequestOptions, decode_json, ensure_success};
use crate::error::Result;
use crate::types::{CreateSessionResponse, NewSession, TodaySummary};

/// Sessions API client.
pub struct SessionsApi {
    client: ApiClient,
}

impl SessionsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Log a work session. An out-of-range mood is rejected locally.
    pub async fn create(&self, session: &NewSession) -> Result<CreateSessionResponse> {
        session.validate()?;
        let options = RequestOptions::post().json(session)?;
        let response = self.client.request("sessions", options).await?;
        decode_json(ensure_success(response, "Failed to save session").await?).await
    }

    /// Mood, energy and focus totals for today.
    pub async fn today(&self) -> Result<TodaySummary> {
        self.client
            .get_json(
                "sessions/today",
                RequestOptions::get(),
                "Failed to load today's summary",
            )
            .await
    }
}
