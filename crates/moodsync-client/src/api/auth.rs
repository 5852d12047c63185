//! Registration, login and logout.
//!
//! Successful register/login install the returned pair into the client's
//! token store; logout always clears it, even when the server call fails.

use tracing::{info, warn};

use crate::client::{ApiClient, RequestOptions, decode_json, ensure_success, parse_error};
use crate::error::Result;
use crate::types::{AuthResponse, LoginRequest, LogoutRequest, RegisterRequest};

/// Auth API client.
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create an account and start a session.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let auth = self.authenticate("auth/register", request).await?;
        info!(user_id = %auth.user_id, "registered new account");
        Ok(auth)
    }

    /// Start a session for an existing account.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let auth = self.authenticate("auth/login", request).await?;
        info!(user_id = %auth.user_id, "logged in");
        Ok(auth)
    }

    /// Revoke the current refresh token server-side and end the local session.
    ///
    /// The local session is cleared regardless of the server's answer; a
    /// server-side failure is still returned so callers can report it.
    pub async fn logout(&self) -> Result<()> {
        // Refresh tokens rotate; revoke the one the server currently holds.
        self.client.ensure_fresh_access_token().await;
        let result = match self.client.store().get() {
            Some(pair) => match pair.refresh() {
                Some(refresh_token) => self.revoke(refresh_token).await,
                None => Ok(()),
            },
            None => Ok(()),
        };

        self.client.store().clear()?;
        match &result {
            Ok(()) => info!("logged out"),
            Err(e) => warn!(error = %e, "server logout failed, local session cleared"),
        }
        result
    }

    async fn revoke(&self, refresh_token: &str) -> Result<()> {
        let options = RequestOptions::post().json(&LogoutRequest { refresh_token })?;
        let response = self.client.request("auth/logout", options).await?;
        ensure_success(response, "Failed to log out").await?;
        Ok(())
    }

    async fn authenticate<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<AuthResponse> {
        let options = RequestOptions::post().without_auth().json(body)?;
        let response = self.client.request(path, options).await?;
        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }
        let auth: AuthResponse = decode_json(response).await?;
        self.client.store().set(auth.tokens())?;
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;
    use crate::test_support::{
        Counter, authorization, expired_token, serve, test_client, valid_token,
    };
    use crate::types::{LoginRequest, RegisterRequest};
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use moodsync_auth::CredentialPair;
    use std::sync::{Arc, Mutex};

    fn auth_body(access: &str) -> serde_json::Value {
        serde_json::json!({
            "user_id": "u1",
            "access_token": access,
            "refresh_token": "R1",
            "expires_at": "2026-10-18T12:00:00Z",
            "has_onboarded": true
        })
    }

    #[tokio::test]
    async fn login_installs_tokens_and_sends_device() {
        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();
        let app = axum::Router::new().route(
            "/auth/login",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some((authorization(&headers), body));
                    Json(auth_body("A1"))
                }
            }),
        );
        let client = test_client(&serve(app).await);
        // A stale session must not leak into the login call
        client
            .store()
            .set(CredentialPair::new("stale", "stale"))
            .unwrap();

        let request = LoginRequest::new("ada@example.com", "hunter22")
            .with_device(Some("laptop".into()), Some("dev-1".into()));
        let auth = client.auth().login(&request).await.unwrap();

        assert_eq!(auth.user_id, "u1");
        assert_eq!(client.store().get(), Some(CredentialPair::new("A1", "R1")));
        let (auth_header, body) = received.lock().unwrap().clone().unwrap();
        assert_eq!(auth_header, None);
        assert_eq!(body["device_name"], "laptop");
        assert_eq!(body["device_id"], "dev-1");
    }

    #[tokio::test]
    async fn register_omits_missing_names() {
        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();
        let app = axum::Router::new().route(
            "/auth/register",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    Json(auth_body("A1"))
                }
            }),
        );
        let client = test_client(&serve(app).await);

        let request = RegisterRequest::new("ada@example.com", "hunter22")
            .with_name(Some("Ada".into()), None);
        client.auth().register(&request).await.unwrap();

        let body = received.lock().unwrap().clone().unwrap();
        assert_eq!(body["first_name"], "Ada");
        assert!(body.get("last_name").is_none());
        assert!(client.store().get().is_some());
    }

    #[tokio::test]
    async fn rejected_login_is_request_failed() {
        let app = axum::Router::new().route(
            "/auth/login",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": "Invalid credentials", "status_code": 401 })),
                )
            }),
        );
        let client = test_client(&serve(app).await);

        let err = client
            .auth()
            .login(&LoginRequest::new("ada@example.com", "wrong"))
            .await
            .unwrap_err();

        match err {
            Error::RequestFailed { message, status } => {
                assert_eq!(message, "Invalid credentials");
                assert_eq!(status, 401);
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        assert!(client.store().get().is_none());
    }

    #[tokio::test]
    async fn logout_revokes_refresh_token_and_clears() {
        let hits = Counter::default();
        let received = Arc::new(Mutex::new(None));
        let (counter, sink) = (hits.clone(), received.clone());
        let app = axum::Router::new().route(
            "/auth/logout",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let (counter, sink) = (counter.clone(), sink.clone());
                async move {
                    counter.incr();
                    *sink.lock().unwrap() = Some((authorization(&headers), body));
                    Json(serde_json::json!({ "success": true }))
                }
            }),
        );
        let client = test_client(&serve(app).await);
        let access = valid_token();
        client
            .store()
            .set(CredentialPair::new(access.clone(), "R1"))
            .unwrap();

        client.auth().logout().await.unwrap();

        assert_eq!(hits.get(), 1);
        let (auth_header, body) = received.lock().unwrap().clone().unwrap();
        assert_eq!(auth_header, Some(format!("Bearer {access}")));
        assert_eq!(body, serde_json::json!({ "refresh_token": "R1" }));
        assert!(client.store().get().is_none());
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let app = axum::Router::new().route(
            "/auth/logout",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = test_client(&serve(app).await);
        client
            .store()
            .set(CredentialPair::new(valid_token(), "R1"))
            .unwrap();

        let err = client.auth().logout().await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(client.store().get().is_none());
    }

    /// `/auth/logout` recording each body, next to a rotating `/auth/refresh`.
    fn rotating_backend(
        refresh_status: StatusCode,
        logout_status: StatusCode,
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    ) -> axum::Router {
        axum::Router::new()
            .route(
                "/auth/refresh",
                post(move || async move {
                    if refresh_status != StatusCode::OK {
                        return (refresh_status, Json(serde_json::json!({ "error": "revoked" })));
                    }
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({ "accessToken": valid_token(), "refreshToken": "R2" })),
                    )
                }),
            )
            .route(
                "/auth/logout",
                post(move |Json(body): Json<serde_json::Value>| {
                    let bodies = bodies.clone();
                    async move {
                        bodies.lock().unwrap().push(body);
                        (logout_status, Json(serde_json::json!({ "error": "token expired" })))
                    }
                }),
            )
    }

    #[tokio::test]
    async fn logout_with_expired_access_revokes_rotated_token() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let app = rotating_backend(StatusCode::OK, StatusCode::OK, bodies.clone());
        let client = test_client(&serve(app).await);
        client
            .store()
            .set(CredentialPair::new(expired_token(), "R1"))
            .unwrap();

        client.auth().logout().await.unwrap();

        assert_eq!(
            bodies.lock().unwrap().as_slice(),
            &[serde_json::json!({ "refresh_token": "R2" })]
        );
        assert!(client.store().get().is_none());
    }

    #[tokio::test]
    async fn logout_rejected_after_failed_refresh_is_an_error() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let app = rotating_backend(
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            bodies.clone(),
        );
        let client = test_client(&serve(app).await);
        client
            .store()
            .set(CredentialPair::new(valid_token(), "R1"))
            .unwrap();

        let err = client.auth().logout().await.unwrap_err();

        assert!(err.is_unauthorized(), "got: {err}");
        assert_eq!(bodies.lock().unwrap().len(), 1);
        assert!(client.store().get().is_none());
    }

    #[tokio::test]
    async fn logout_without_session_skips_server() {
        let hits = Counter::default();
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/auth/logout",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.incr();
                    StatusCode::OK
                }
            }),
        );
        let client = test_client(&serve(app).await);

        client.auth().logout().await.unwrap();
        assert_eq!(hits.get(), 0);
    }
}
