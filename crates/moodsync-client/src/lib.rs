//! MoodSync API client
//!
//! `ApiClient` wraps one backend base URL, one token store and one refresh
//! coordinator. Feature wrappers hang off it:
//!
//! - `auth()`: register, login, logout
//! - `sessions()`: log a session, today's totals
//! - `history()`: paged session history and detail
//! - `insights()`, `recommendation()`, `onboarding()`, `summary()`
//!
//! All of them funnel through `ApiClient::request`, which keeps the access
//! token fresh and retries a rejected request at most once.

pub mod api;
pub mod client;
pub mod error;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use api::*;
pub use client::{ApiClient, ClientBuilder, RequestOptions};
pub use error::{Error, Result};
pub use types::*;
pub use watcher::SessionWatcher;

pub use moodsync_auth::{CredentialPair, FileBackend, MemoryBackend, TokenBackend, TokenStore};
