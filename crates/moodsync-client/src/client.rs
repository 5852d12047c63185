//! Authenticated request dispatcher
//!
//! Every feature call goes through `ApiClient::request`. For authenticated
//! calls it:
//! 1. Refreshes up front when the stored access token is (nearly) expired
//! 2. Attaches `Authorization: Bearer <access>`
//! 3. On a 401, refreshes once and replays the request once
//!
//! Refreshes go through the shared `RefreshCoordinator`, so a burst of
//! requests holding the same stale token produces a single refresh call.
//! Non-2xx responses other than a recoverable 401 become
//! `Error::RequestFailed`.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moodsync_auth::{CredentialPair, DEFAULT_EXPIRY_SKEW_SECS, RefreshCoordinator, TokenStore};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{
    AuthApi, HistoryApi, InsightsApi, OnboardingApi, RecommendationApi, SessionsApi, SummaryApi,
};
use crate::error::{Error, Result};
use crate::watcher::SessionWatcher;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Message used when an error response has no usable body.
const GENERIC_ERROR: &str = "Request failed";

/// One outgoing request, minus its path.
///
/// `auth` defaults to true; unauthenticated calls (login, register) opt out
/// with `without_auth()`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            auth: true,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send without credentials and never refresh.
    pub fn without_auth(mut self) -> Self {
        self.auth = false;
        self
    }
}

/// MoodSync API client.
///
/// Cheap to clone; clones share the token store and the refresh
/// coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<TokenStore>,
    refresher: RefreshCoordinator,
    expiry_skew_secs: u64,
}

impl ApiClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The token store this client reads credentials from.
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.inner.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.inner.refresher
    }

    /// Observe authentication state for this client's session.
    pub fn watch(&self) -> SessionWatcher {
        SessionWatcher::new(&self.inner.store)
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn sessions(&self) -> SessionsApi {
        SessionsApi::new(self.clone())
    }

    pub fn history(&self) -> HistoryApi {
        HistoryApi::new(self.clone())
    }

    pub fn insights(&self) -> InsightsApi {
        InsightsApi::new(self.clone())
    }

    pub fn recommendation(&self) -> RecommendationApi {
        RecommendationApi::new(self.clone())
    }

    pub fn onboarding(&self) -> OnboardingApi {
        OnboardingApi::new(self.clone())
    }

    pub fn summary(&self) -> SummaryApi {
        SummaryApi::new(self.clone())
    }

    /// Build the absolute URL for an API path plus query parameters.
    pub(crate) fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("invalid request path {path:?}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Issue `options` against `path`.
    ///
    /// Returns the response for any 2xx status. A 401 is returned as-is when
    /// `auth` is off, or when a reactive refresh fails or leaves no access
    /// token. Other non-2xx statuses fail with `Error::RequestFailed`.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let url = self.url(path, &options.query)?;

        if options.auth {
            self.ensure_fresh_access_token().await;
        }

        let tokens = if options.auth {
            self.inner.store.get()
        } else {
            None
        };
        let mut headers = options.headers.clone();
        if let Some(access) = tokens.as_ref().and_then(CredentialPair::access) {
            headers.insert(AUTHORIZATION, bearer(access)?);
        }

        let response = self.send(&url, &options, headers.clone()).await?;
        let status = response.status();

        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            return Err(parse_error(response).await);
        }
        if status != StatusCode::UNAUTHORIZED || !options.auth {
            return Ok(response);
        }

        let Some(refresh_token) = tokens.as_ref().and_then(CredentialPair::refresh) else {
            warn!(path, "unauthorized without a refresh token, ending session");
            if let Err(e) = self.inner.store.clear() {
                warn!(error = %e, "failed to clear tokens");
            }
            return Err(parse_error(response).await);
        };

        let Some(access) = self.access_after_unauthorized(path, refresh_token).await else {
            return Ok(response);
        };

        headers.insert(AUTHORIZATION, bearer(&access)?);
        debug!(path, "retrying request with refreshed access token");
        let retry = self.send(&url, &options, headers).await?;
        if !retry.status().is_success() {
            return Err(parse_error(retry).await);
        }
        Ok(retry)
    }

    /// Access token to replay a rejected request with, if any.
    ///
    /// When another request already rotated the pair since `refresh_token`
    /// was read, the stored access token is reused; refreshing again with the
    /// spent token would be rejected and end a live session.
    async fn access_after_unauthorized(&self, path: &str, refresh_token: &str) -> Option<String> {
        if let Some(current) = self.inner.store.get()
            && current.refresh().is_some_and(|stored| stored != refresh_token)
        {
            debug!(path, "credentials rotated concurrently, skipping refresh");
            return current.access().map(str::to_owned);
        }

        if let Err(e) = self.inner.refresher.refresh(refresh_token).await {
            debug!(path, error = %e, "reactive refresh failed, returning original response");
            return None;
        }

        self.inner
            .store
            .get()
            .and_then(|pair| pair.access().map(str::to_owned))
    }

    /// GET `path` and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
        fallback: &str,
    ) -> Result<T> {
        let response = self.request(path, options).await?;
        decode_json(ensure_success(response, fallback).await?).await
    }

    /// Refresh before sending when the stored access token has expired.
    ///
    /// A failed refresh is ignored here; the request goes out with whatever
    /// credentials remain and the server decides.
    pub(crate) async fn ensure_fresh_access_token(&self) {
        let Some(tokens) = self.inner.store.get() else {
            return;
        };
        let (Some(access), Some(refresh)) = (tokens.access(), tokens.refresh()) else {
            return;
        };
        if !moodsync_auth::is_expired(access, self.inner.expiry_skew_secs) {
            return;
        }

        debug!("access token expired, refreshing before request");
        if let Err(e) = self.inner.refresher.refresh(refresh).await {
            debug!(error = %e, "preemptive refresh failed, continuing");
        }
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        headers: HeaderMap,
    ) -> Result<Response> {
        let mut builder = self
            .inner
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }
        Ok(builder.send().await?)
    }
}

fn bearer(access: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {access}"))
        .map_err(|_| Error::Config("access token is not a valid header value".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Build `RequestFailed` from an error response.
///
/// Message preference: the JSON body's `error` string, then the raw body,
/// then a generic message.
pub(crate) async fn parse_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = error_field(&body).unwrap_or_else(|| {
        if body.is_empty() {
            GENERIC_ERROR.to_owned()
        } else {
            body
        }
    });
    Error::RequestFailed { message, status }
}

/// The `error` string of a JSON error body, if there is one.
fn error_field(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
}

/// Pass 2xx responses through; anything else becomes `RequestFailed` with
/// the raw body, or `fallback` when the body is empty.
pub(crate) async fn ensure_success(response: Response, fallback: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        fallback.to_owned()
    } else {
        body
    };
    Err(Error::RequestFailed { message, status })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builder for `ApiClient`.
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    store: Option<Arc<TokenStore>>,
    expiry_skew_secs: u64,
    user_agent: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            store: None,
            expiry_skew_secs: DEFAULT_EXPIRY_SKEW_SECS,
            user_agent: None,
        }
    }

    /// Base URL of the backend; paths are resolved relative to it.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Transport timeout applied to every request, including refreshes.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token store to use. Defaults to an in-memory store.
    pub fn token_store(mut self, store: Arc<TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Margin before `exp` at which access tokens count as expired.
    pub fn expiry_skew_secs(mut self, secs: u64) -> Self {
        self.expiry_skew_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let mut base_url = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid base_url {base_url:?}: {e}")))?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("moodsync-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(user_agent)
            .build()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(TokenStore::in_memory()));
        let refresher = RefreshCoordinator::new(http.clone(), &base_url, store.clone())?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                store,
                refresher,
                expiry_skew_secs: self.expiry_skew_secs,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
