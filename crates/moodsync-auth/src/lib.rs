//! MoodSync credential handling
//!
//! Owns the client-side half of the backend's session model: the persisted
//! credential pair, local expiry detection from the access token's claims,
//! and the single-flight refresh exchange. Nothing here issues feature
//! requests; the dispatcher in `moodsync-client` builds on these pieces.
//!
//! Credential flow:
//! 1. Login/registration installs a pair via `credentials::TokenStore::set()`
//! 2. Before each protected call, `expiry::is_expired()` inspects the access token
//! 3. Expired or rejected tokens go through `refresh::RefreshCoordinator::refresh()`
//! 4. The coordinator replaces the stored pair, or clears it on failure

pub mod constants;
pub mod credentials;
pub mod error;
pub mod expiry;
pub mod refresh;

pub use constants::*;
pub use credentials::{
    CredentialPair, FileBackend, MemoryBackend, Subscription, TokenBackend, TokenStore,
};
pub use error::{Error, Result};
pub use expiry::{Claims, MalformedCredential, decode_claims, is_expired, is_expired_at};
pub use refresh::{RefreshCoordinator, RefreshResponse};
