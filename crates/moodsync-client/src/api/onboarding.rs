//! Onboarding completion.

use crate::client::{ApiClient, RequestOptions, decode_json, ensure_success};
use crate::error::Result;
use crate::types::OnboardingStatus;

/// Onboarding API client.
pub struct OnboardingApi {
    client: ApiClient,
}

impl OnboardingApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Mark the signed-in user as onboarded.
    pub async fn complete(&self) -> Result<OnboardingStatus> {
        let response = self
            .client
            .request("onboarding/complete", RequestOptions::post())
            .await?;
        decode_json(ensure_success(response, "Failed to complete onboarding").await?).await
    }
}
