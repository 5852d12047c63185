//! Single-flight token refresh
//!
//! `RefreshCoordinator` exchanges a refresh token at `POST /auth/refresh` and
//! writes the outcome into the `TokenStore`. However many tasks ask for a
//! refresh at once, only one exchange is on the wire: the first caller
//! installs a shared future in the in-flight slot and everyone else awaits a
//! clone of it. The exchange clears the slot itself when it finishes, before
//! any caller sees the result, so the next refresh always starts fresh.
//!
//! A failed exchange ends the session: the store is cleared before the error
//! reaches any caller.

use std::sync::{Arc, Mutex, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::REFRESH_PATH;
use crate::credentials::{CredentialPair, TokenStore, lock};
use crate::error::{Error, Result};

/// Body sent to the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Refresh endpoint response.
///
/// The endpoint answers in camelCase, unlike login/register; the snake_case
/// spellings are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
    #[serde(rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: String,
}

impl From<RefreshResponse> for CredentialPair {
    fn from(response: RefreshResponse) -> Self {
        CredentialPair::new(response.access_token, response.refresh_token)
    }
}

type InFlight = Shared<BoxFuture<'static, Result<CredentialPair>>>;

/// Shared between the coordinator and its in-flight exchange.
struct Exchange {
    client: reqwest::Client,
    endpoint: Url,
    store: Arc<TokenStore>,
}

/// Collapses concurrent refresh requests into one exchange.
///
/// Each coordinator has its own in-flight slot; construct one per session.
pub struct RefreshCoordinator {
    exchange: Arc<Exchange>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
}

impl RefreshCoordinator {
    /// Coordinator refreshing against `base_url` (which should end in `/`).
    pub fn new(client: reqwest::Client, base_url: &Url, store: Arc<TokenStore>) -> Result<Self> {
        let endpoint = base_url
            .join(REFRESH_PATH)
            .map_err(|e| Error::RefreshFailed(format!("invalid refresh endpoint: {e}")))?;
        Ok(Self {
            exchange: Arc::new(Exchange {
                client,
                endpoint,
                store,
            }),
            in_flight: Arc::new(Mutex::new(None)),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.exchange.endpoint
    }

    /// Whether an exchange is currently on the wire.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Exchange `refresh_token` for a new pair, or join the exchange already
    /// in flight.
    ///
    /// On success the new pair is already in the store. On failure the store
    /// has been cleared and every joined caller gets the same
    /// `Error::RefreshFailed`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair> {
        let pending = {
            let mut slot = lock(&self.in_flight);
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = run_exchange(
                        self.exchange.clone(),
                        refresh_token.to_owned(),
                        Arc::downgrade(&self.in_flight),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }
}

async fn run_exchange(
    exchange: Arc<Exchange>,
    refresh_token: String,
    slot: Weak<Mutex<Option<InFlight>>>,
) -> Result<CredentialPair> {
    let outcome = match exchange.request(&refresh_token).await {
        Ok(pair) => exchange
            .store
            .set(pair.clone())
            .map(|()| pair)
            .map_err(|e| Error::RefreshFailed(format!("storing refreshed tokens: {e}"))),
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(_) => info!("token refresh succeeded"),
        Err(e) => {
            warn!(error = %e, "token refresh failed, ending session");
            if let Err(clear_err) = exchange.store.clear() {
                warn!(error = %clear_err, "failed to clear tokens after refresh failure");
            }
        }
    }

    if let Some(slot) = slot.upgrade() {
        *lock(&slot) = None;
    }
    outcome
}

impl Exchange {
    async fn request(&self, refresh_token: &str) -> Result<CredentialPair> {
        debug!(endpoint = %self.endpoint, "refreshing access token");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| Error::RefreshFailed(format!("refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::RefreshFailed(format!(
                "refresh endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<RefreshResponse>()
            .await
            .map(CredentialPair::from)
            .map_err(|e| Error::RefreshFailed(format!("invalid refresh response: {e}")))
    }
}
