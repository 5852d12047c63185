//! Request and response types for the MoodSync backend.
//!
//! Field spellings follow the wire: the auth and today-summary endpoints
//! speak snake_case, everything session/analytics related speaks camelCase.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use common::Secret;
use moodsync_auth::CredentialPair;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Body for `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(serialize_with = "common::serialize_exposed")]
    pub password: Secret<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    pub fn new(email: impl Into<String>, password: impl Into<Secret<String>>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_name(mut self, first: Option<String>, last: Option<String>) -> Self {
        self.first_name = first;
        self.last_name = last;
        self
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &self.password)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Body for `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(serialize_with = "common::serialize_exposed")]
    pub password: Secret<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<Secret<String>>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            device_name: None,
            device_id: None,
        }
    }

    pub fn with_device(mut self, name: Option<String>, id: Option<String>) -> Self {
        self.device_name = name;
        self.device_id = id;
        self
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &self.password)
            .field("device_name", &self.device_name)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Body for `POST /auth/logout`.
#[derive(Debug, Serialize)]
pub(crate) struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from register and login.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
    #[serde(default)]
    pub has_onboarded: Option<bool>,
}

impl AuthResponse {
    /// The credential pair carried by this response.
    pub fn tokens(&self) -> CredentialPair {
        CredentialPair::new(self.access_token.clone(), self.refresh_token.clone())
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("has_onboarded", &self.has_onboarded)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Error parsing an enum label from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}, expected one of: {expected}")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Energy {
    Low,
    Medium,
    High,
}

impl Energy {
    pub fn label(&self) -> &'static str {
        match self {
            Energy::Low => "Low",
            Energy::Medium => "Medium",
            Energy::High => "High",
        }
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Energy {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Energy::Low),
            "medium" => Ok(Energy::Medium),
            "high" => Ok(Energy::High),
            _ => Err(ParseLabelError {
                kind: "energy level",
                value: s.to_owned(),
                expected: "low, medium, high",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "Deep work")]
    DeepWork,
    Study,
    #[serde(rename = "Light work")]
    LightWork,
    Rest,
}

impl TaskType {
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::DeepWork => "Deep work",
            TaskType::Study => "Study",
            TaskType::LightWork => "Light work",
            TaskType::Rest => "Rest",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskType {
    type Err = ParseLabelError;

    /// Accepts the wire labels and their kebab/snake spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "deepwork" => Ok(TaskType::DeepWork),
            "study" => Ok(TaskType::Study),
            "lightwork" => Ok(TaskType::LightWork),
            "rest" => Ok(TaskType::Rest),
            _ => Err(ParseLabelError {
                kind: "task type",
                value: s.to_owned(),
                expected: "deep-work, study, light-work, rest",
            }),
        }
    }
}

/// Body for `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub mood: u8,
    pub energy: Energy,
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good_session: Option<bool>,
}

/// Mood ratings the backend accepts.
pub const MOOD_RANGE: RangeInclusive<u8> = 1..=5;

impl NewSession {
    /// A session with `mood` checked against `MOOD_RANGE`.
    pub fn new(mood: u8, energy: Energy, task_type: TaskType) -> crate::Result<Self> {
        let session = Self {
            mood,
            energy,
            task_type,
            good_session: None,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn with_good_session(mut self, good: Option<bool>) -> Self {
        self.good_session = good;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if MOOD_RANGE.contains(&self.mood) {
            Ok(())
        } else {
            Err(crate::Error::InvalidInput(format!(
                "mood must be between {} and {}, got {}",
                MOOD_RANGE.start(),
                MOOD_RANGE.end(),
                self.mood
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: String,
}

/// `GET /sessions/today`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodaySummary {
    pub current_mood: Option<i64>,
    pub current_energy: Option<String>,
    pub sessions_today: u32,
    pub total_focus_minutes: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListItem {
    pub id: String,
    pub date: String,
    pub task_type: String,
    pub mood: i64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub id: String,
    pub date: String,
    pub task_type: String,
    pub mood: i64,
    pub duration_minutes: i64,
    #[serde(default)]
    pub energy: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub good_session: Option<bool>,
}

/// One page of `GET /sessions/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistory {
    pub items: Vec<SessionListItem>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Insights, recommendation, onboarding, summary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepWorkSlot {
    /// 0 = Sunday
    pub day_of_week: u8,
    pub hour: u8,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningCard {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// `GET /analytics/insights`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    pub best_deep_work_slots: Vec<DeepWorkSlot>,
    pub mood_energy_insight: String,
    #[serde(default)]
    pub warning_card: Option<WarningCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub task_type: String,
    pub reason: String,
}

/// `POST /onboarding/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingStatus {
    pub success: bool,
    pub has_onboarded: bool,
}

/// `GET /ai/summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub summary: String,
    /// `cache`, `gemini` or `fallback`
    pub source: String,
}
