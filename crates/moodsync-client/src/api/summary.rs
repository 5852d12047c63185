//! AI-written weekly summary.

use crate::client::{ApiClient, RequestOptions};
use crate::error::Result;
use crate::types::WeeklySummary;

/// Weekly summary API client.
pub struct SummaryApi {
    client: ApiClient,
}

impl SummaryApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn weekly_summary(&self) -> Result<WeeklySummary> {
        self.client
            .get_json(
                "ai/summary",
                RequestOptions::get(),
                "Failed to load weekly summary",
            )
            .await
    }
}
