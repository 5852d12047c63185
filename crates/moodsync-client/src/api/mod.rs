//! Typed wrappers over the dispatcher, one per backend area.

mod auth;
mod history;
mod insights;
mod onboarding;
mod recommendation;
mod sessions;
mod summary;

pub use auth::AuthApi;
pub use history::{DEFAULT_PAGE_SIZE, HistoryApi};
pub use insights::InsightsApi;
pub use onboarding::OnboardingApi;
pub use recommendation::RecommendationApi;
pub use sessions::SessionsApi;
pub use summary::SummaryApi;
