//! Next-task recommendation.

use reqwest::StatusCode;

use crate::client::{ApiClient, RequestOptions, decode_json, ensure_success};
use crate::error::{Error, Result};
use crate::types::Recommendation;

/// Recommendation API client.
pub struct RecommendationApi {
    client: ApiClient,
}

impl RecommendationApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Suggested task type for right now.
    ///
    /// `None` when the backend has too little history to recommend anything
    /// (204 or 404).
    pub async fn get(&self) -> Result<Option<Recommendation>> {
        let response = match self
            .client
            .request("recommendation", RequestOptions::get())
            .await
        {
            Ok(response) => response,
            Err(Error::RequestFailed { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let response = ensure_success(response, "Unable to load recommendation").await?;
        decode_json(response).await.map(Some)
    }
}
