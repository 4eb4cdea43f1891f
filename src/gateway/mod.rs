use crate::{
    session::models::RefreshResponse,
    store::CredentialStore,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info_span, instrument, warn, Instrument};
use url::Url;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Non-success response passed through untouched, including a terminal 401.
    #[error("request failed with status {status}")]
    Status { status: u16, body: Value },
    #[error("credential renewal failed: {detail}")]
    RenewalFailed { detail: String },
    /// Renewal could not complete for a reason that may clear up on its own
    /// (5xx, transport). Credentials are untouched.
    #[error("credential renewal temporarily unavailable: {detail}")]
    RenewalUnavailable { detail: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Payload(#[from] serde_json::Error),
    #[error("invalid API URL: {detail}")]
    InvalidUrl { detail: String },
}

impl GatewayError {
    /// Status code when the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why the session-expired procedure ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    MissingRefreshToken,
    RenewalRejected,
}

/// Event emitted after the store has been cleared; the application layer
/// subscribes and navigates back to the login entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpired {
    pub reason: ExpiryReason,
}

/// Outcome of a successful renewal.
///
/// `expires_in` is zero when a concurrent renewal already produced the token
/// and no backend call was made.
#[derive(Debug, Clone)]
pub struct Renewed {
    pub access_token: String,
    pub expires_in: u64,
}

enum RenewalError {
    MissingRefreshToken,
    Rejected(String),
    Transient(String),
}

/// Extract the backend's error detail from a failure payload.
fn error_detail(body: &Value) -> &str {
    body.get("detail").and_then(Value::as_str).unwrap_or("")
}

/// Build a full endpoint URL from the configured base, normalizing scheme and
/// port.
pub fn endpoint_url(base: &str, path: &str) -> Result<String, GatewayError> {
    let url = Url::parse(base).map_err(|e| GatewayError::InvalidUrl {
        detail: e.to_string(),
    })?;

    let scheme = url.scheme();

    let host = url.host().ok_or_else(|| GatewayError::InvalidUrl {
        detail: "no host specified".to_string(),
    })?;

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => {
                return Err(GatewayError::InvalidUrl {
                    detail: format!("unsupported scheme {scheme}"),
                })
            }
        },
    };

    Ok(format!("{scheme}://{host}:{port}{path}"))
}

async fn read_body(response: reqwest::Response) -> Result<Value, GatewayError> {
    let bytes = response.bytes().await?;

    if bytes.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn read_error_body(response: reqwest::Response) -> Value {
    response.json().await.unwrap_or(Value::Null)
}

/// Wraps every outbound call to the backend: injects the current access token,
/// intercepts a 401 and gives the request exactly one renewal-and-replay
/// chance.
pub struct Gateway {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
    renewal_gate: Mutex<()>,
    expired_tx: mpsc::UnboundedSender<SessionExpired>,
}

impl Gateway {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or `base_url` is
    /// not a usable http(s) URL.
    pub fn new(
        base_url: &str,
        store: Arc<CredentialStore>,
        expired_tx: mpsc::UnboundedSender<SessionExpired>,
    ) -> Result<Self, GatewayError> {
        // Validate the base URL up front instead of on first use.
        endpoint_url(base_url, "/")?;

        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            store,
            renewal_gate: Mutex::new(()),
            expired_tx,
        })
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = endpoint_url(&self.base_url, path)?;

        let mut request = self.client.request(method.clone(), &url);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let span = info_span!(
            "http-request",
            http.method = %method,
            url = %url
        );

        Ok(request.send().instrument(span).await?)
    }

    /// Authenticated request with the renewal protocol.
    ///
    /// A 401 with the retry marker unset triggers one renewal and one replay;
    /// the replay's outcome is final, a second 401 is propagated as-is.
    ///
    /// # Errors
    /// `Status` for any non-success response, `RenewalFailed` when the renewal
    /// attempt itself was rejected, `Transport`/`Payload` for wire problems.
    #[instrument(skip(self, body))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let mut retried = false;

        loop {
            let attempted_token = self.store.access_token();

            let response = self
                .dispatch(method.clone(), path, body, attempted_token.as_deref())
                .await?;

            let status = response.status();

            if status.is_success() {
                return read_body(response).await;
            }

            let payload = read_error_body(response).await;

            if status == StatusCode::UNAUTHORIZED && !retried {
                retried = true;

                match self.renew(attempted_token.as_deref()).await {
                    Ok(_) => {
                        debug!("access token renewed, replaying request");
                        continue;
                    }
                    Err(RenewalError::MissingRefreshToken) => {
                        self.session_expired(ExpiryReason::MissingRefreshToken);

                        // The caller observes the original failure.
                        return Err(GatewayError::Status {
                            status: status.as_u16(),
                            body: payload,
                        });
                    }
                    Err(RenewalError::Rejected(detail)) => {
                        self.session_expired(ExpiryReason::RenewalRejected);

                        return Err(GatewayError::RenewalFailed { detail });
                    }
                    Err(RenewalError::Transient(detail)) => {
                        // Credentials stay put; the caller observes the
                        // original 401 and may retry the whole request.
                        warn!("renewal temporarily unavailable: {detail}");

                        return Err(GatewayError::Status {
                            status: status.as_u16(),
                            body: payload,
                        });
                    }
                }
            }

            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: payload,
            });
        }
    }

    /// Request outside the renewal protocol.
    ///
    /// Login and logout use this path: a 401 from them means bad credentials
    /// or a dead session, not an expired access token.
    ///
    /// # Errors
    /// `Status` for any non-success response, `Transport`/`Payload` for wire
    /// problems.
    #[instrument(skip(self, body))]
    pub async fn send_unguarded(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let token = self.store.access_token();

        let response = self
            .dispatch(method, path, body, token.as_deref())
            .await?;

        let status = response.status();

        if status.is_success() {
            return read_body(response).await;
        }

        let payload = read_error_body(response).await;

        Err(GatewayError::Status {
            status: status.as_u16(),
            body: payload,
        })
    }

    /// Explicit renewal entry point, same single-flight path as the 401
    /// interception. On `RenewalFailed` the session-expired procedure has
    /// already run; on `RenewalUnavailable` credentials are untouched.
    ///
    /// # Errors
    /// `RenewalFailed` when no refresh token is stored or the backend rejected
    /// the renewal, `RenewalUnavailable` when the backend could not be asked.
    pub async fn renew_access(&self) -> Result<Renewed, GatewayError> {
        let current = self.store.access_token();

        match self.renew(current.as_deref()).await {
            Ok(renewed) => Ok(renewed),
            Err(RenewalError::MissingRefreshToken) => {
                self.session_expired(ExpiryReason::MissingRefreshToken);

                Err(GatewayError::RenewalFailed {
                    detail: "no refresh token stored".to_string(),
                })
            }
            Err(RenewalError::Rejected(detail)) => {
                self.session_expired(ExpiryReason::RenewalRejected);

                Err(GatewayError::RenewalFailed { detail })
            }
            Err(RenewalError::Transient(detail)) => {
                Err(GatewayError::RenewalUnavailable { detail })
            }
        }
    }

    /// One renewal call per expiry event: concurrent failures wait on the gate
    /// and reuse the token the first one obtained.
    async fn renew(&self, failed_token: Option<&str>) -> Result<Renewed, RenewalError> {
        let _gate = self.renewal_gate.lock().await;

        if let (Some(current), Some(failed)) = (self.store.access_token(), failed_token) {
            if current != failed {
                debug!("access token already renewed by a concurrent request");

                return Ok(Renewed {
                    access_token: current,
                    expires_in: 0,
                });
            }
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(RenewalError::MissingRefreshToken);
        };

        debug!("renewing access token");

        let body = json!({ "refresh_token": refresh_token });

        let response = match self
            .dispatch(Method::POST, "/auth/refresh", Some(&body), None)
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(RenewalError::Transient(e.to_string())),
        };

        let status = response.status();

        if !status.is_success() {
            let payload = read_error_body(response).await;
            let detail = format!("{status} {}", error_detail(&payload));

            // A 4xx is the backend refusing the refresh token; anything else
            // is a backend hiccup worth retrying against intact credentials.
            return Err(if status.is_client_error() {
                RenewalError::Rejected(detail)
            } else {
                RenewalError::Transient(detail)
            });
        }

        let renewed: RefreshResponse = match response.json().await {
            Ok(renewed) => renewed,
            Err(e) => return Err(RenewalError::Transient(e.to_string())),
        };

        self.store.set_access_token(&renewed.access_token);

        Ok(Renewed {
            access_token: renewed.access_token,
            expires_in: renewed.expires_in,
        })
    }

    fn session_expired(&self, reason: ExpiryReason) {
        warn!(?reason, "session expired, clearing credentials");

        self.store.clear();

        // No subscriber is fine; the event is advisory.
        let _ = self.expired_tx.send(SessionExpired { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_fills_default_ports() {
        assert_eq!(
            endpoint_url("http://api.pdifinance.com", "/auth/me").unwrap(),
            "http://api.pdifinance.com:80/auth/me"
        );
        assert_eq!(
            endpoint_url("https://api.pdifinance.com", "/auth/me").unwrap(),
            "https://api.pdifinance.com:443/auth/me"
        );
    }

    #[test]
    fn endpoint_url_keeps_explicit_port() {
        assert_eq!(
            endpoint_url("http://localhost:3333", "/auth/login").unwrap(),
            "http://localhost:3333/auth/login"
        );
    }

    #[test]
    fn endpoint_url_rejects_unsupported_scheme() {
        assert!(endpoint_url("ftp://api.pdifinance.com", "/").is_err());
        assert!(endpoint_url("not a url", "/").is_err());
    }

    #[test]
    fn error_detail_handles_missing_payload() {
        assert_eq!(error_detail(&Value::Null), "");
        assert_eq!(
            error_detail(&json!({ "detail": "Credenciais inválidas" })),
            "Credenciais inválidas"
        );
    }
}
