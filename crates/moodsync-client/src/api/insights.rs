//! Aggregated analytics.

use crate::client::{ApiClient, RequestOptions};
use crate::error::Result;
use crate::types::InsightSummary;

/// Insights API client.
pub struct InsightsApi {
    client: ApiClient,
}

impl InsightsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Best deep-work windows, mood/energy insight and any warning card.
    pub async fn summary(&self) -> Result<InsightSummary> {
        self.client
            .get_json(
                "analytics/insights",
                RequestOptions::get(),
                "Failed to load insights",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{serve, test_client};
    use crate::types::Severity;
    use axum::Json;
    use axum::routing::get;

    #[tokio::test]
    async fn summary_decodes_slots_and_warning() {
        let app = axum::Router::new().route(
            "/analytics/insights",
            get(|| async {
                Json(serde_json::json!({
                    "bestDeepWorkSlots": [
                        {"dayOfWeek": 2, "hour": 10, "score": 0.9},
                        {"dayOfWeek": 4, "hour": 14, "score": 0.7}
                    ],
                    "moodEnergyInsight": "High energy mornings line up with good moods",
                    "warningCard": {"title": "Low mood streak", "message": "Three low days", "severity": "warning"}
                }))
            }),
        );
        let client = test_client(&serve(app).await);

        let summary = client.insights().summary().await.unwrap();
        assert_eq!(summary.best_deep_work_slots.len(), 2);
        assert_eq!(summary.best_deep_work_slots[0].day_of_week, 2);
        assert_eq!(summary.warning_card.unwrap().severity, Severity::Warning);
    }
}
