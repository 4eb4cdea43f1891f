pub mod error;
pub mod models;
pub mod renew;

use crate::{
    gateway::{Gateway, GatewayError},
    store::CredentialStore,
};
use error::SessionError;
use models::{LoginRequest, LoginResponse, TokenPair, UserProfile};
use reqwest::Method;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Successful login: persisted credentials plus the profile the backend
/// returned with them.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub expires_in: u64,
}

/// Higher-level session operations, mediating between the request gateway and
/// the credential store.
pub struct SessionService {
    gateway: Arc<Gateway>,
    store: Arc<CredentialStore>,
}

impl SessionService {
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, store: Arc<CredentialStore>) -> Self {
        Self { gateway, store }
    }

    #[must_use]
    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }

    /// Authenticate against the backend and persist credentials plus profile.
    ///
    /// # Errors
    /// `LoginRejected` carrying the backend's error detail (or a generic
    /// message when the payload has none), `Request` for transport problems.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, SessionError> {
        let request = LoginRequest::new(email, password);
        let body = serde_json::to_value(&request)
            .map_err(|e| SessionError::Request(e.to_string()))?;

        let response = self
            .gateway
            .send_unguarded(Method::POST, "/auth/login", Some(&body))
            .await
            .map_err(|e| match e {
                GatewayError::Status { body, .. } => {
                    let detail = body.get("detail").and_then(serde_json::Value::as_str);
                    SessionError::LoginRejected(
                        detail.unwrap_or("invalid credentials").to_string(),
                    )
                }
                other => SessionError::Request(other.to_string()),
            })?;

        let login: LoginResponse = serde_json::from_value(response)
            .map_err(|e| SessionError::Request(e.to_string()))?;

        self.store.save_tokens(&TokenPair {
            access_token: Some(login.access_token),
            refresh_token: login.refresh_token,
        });
        self.store.save_user(&login.user);

        debug!(user_id = login.user.id, "login succeeded");

        Ok(LoginOutcome {
            user: login.user,
            expires_in: login.expires_in,
        })
    }

    /// Revoke the session on the backend (best effort) and always clear the
    /// local store. Local teardown must succeed regardless of backend
    /// reachability, so failures are logged and swallowed.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self
            .gateway
            .send_unguarded(Method::POST, "/auth/logout", None)
            .await
        {
            warn!("backend logout failed, discarding session anyway: {e}");
        }

        self.store.clear();
    }

    /// Fetch the authoritative profile through the guarded gateway, so the
    /// call participates in the renewal protocol.
    ///
    /// # Errors
    /// `RenewalFailed` passes through as itself (the session is already torn
    /// down); anything else becomes `ProfileFetchFailed`.
    #[instrument(skip(self))]
    pub async fn fetch_current_user(&self) -> Result<UserProfile, SessionError> {
        let response = self
            .gateway
            .send(Method::GET, "/auth/me", None)
            .await
            .map_err(|e| match e {
                GatewayError::RenewalFailed { detail } => SessionError::RenewalFailed(detail),
                other => SessionError::ProfileFetchFailed(other.to_string()),
            })?;

        let user: UserProfile = serde_json::from_value(response)
            .map_err(|e| SessionError::ProfileFetchFailed(e.to_string()))?;

        self.store.save_user(&user);

        Ok(user)
    }

    /// Presence check only: an expired access token still counts until the
    /// first failed request discovers it.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store.access_token().is_some()
    }

    /// Cached profile from the store; may be stale until the next
    /// `fetch_current_user`.
    #[must_use]
    pub fn cached_user(&self) -> Option<UserProfile> {
        self.store.load_user()
    }

    /// Explicit renewal. A rejected renewal tears the session down (backend
    /// logout is attempted best effort, the store is cleared) and the error is
    /// re-raised; a transient failure leaves the credentials in place.
    ///
    /// # Errors
    /// `RenewalFailed` with the renewal rejection detail, `Request` when the
    /// backend could not be asked and the renewal may be retried.
    #[instrument(skip(self))]
    pub async fn renew(&self) -> Result<String, SessionError> {
        match self.gateway.renew_access().await {
            Ok(renewed) => Ok(renewed.access_token),
            Err(GatewayError::RenewalUnavailable { detail }) => {
                Err(SessionError::Request(detail))
            }
            Err(GatewayError::RenewalFailed { detail }) => {
                self.logout().await;

                Err(SessionError::RenewalFailed(detail))
            }
            Err(other) => {
                self.logout().await;

                Err(SessionError::RenewalFailed(other.to_string()))
            }
        }
    }
}
