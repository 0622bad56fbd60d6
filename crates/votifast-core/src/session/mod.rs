//! Authenticated identity shared by the catalog and the license exchange.
//!
//! `SessionManager` is the only owner of the [`Credential`]. Callers never see
//! it directly; they go through [`SessionManager::ensure_authenticated`] (or
//! `send_authenticated`, which calls it right before composing headers).
//!
//! Concurrent callers that find the credential missing or expired share one
//! in-flight refresh: the first caller installs a `Shared` future in the slot,
//! later callers clone it, and the future itself installs the outcome, so all
//! of them observe the same credential or the same `AuthenticationError`.

mod credential;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::endpoints::{ApiEndpoints, CLIENT_VERSION};
use crate::error::{AuthenticationError, MetadataError};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::otp::OneTimeCode;

pub use credential::{Clock, Credential, SystemClock};

type RefreshFuture = Shared<BoxFuture<'static, Result<Arc<Credential>, AuthenticationError>>>;

enum Slot {
    Empty,
    Ready(Arc<Credential>),
    Refreshing(RefreshFuture),
}

struct Inner {
    http: HttpClient,
    endpoints: ApiEndpoints,
    otp: Arc<dyn OneTimeCode>,
    clock: Arc<dyn Clock>,
    margin_secs: u64,
    slot: Mutex<Slot>,
    refreshes: AtomicU64,
}

/// Cloneable handle; all clones share one credential.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(http: HttpClient, endpoints: ApiEndpoints, otp: Arc<dyn OneTimeCode>) -> Self {
        Self::with_clock(http, endpoints, otp, Arc::new(SystemClock), 0)
    }

    /// Full constructor: custom clock and a safety margin (seconds) subtracted
    /// from the credential's lifetime.
    pub fn with_clock(
        http: HttpClient,
        endpoints: ApiEndpoints,
        otp: Arc<dyn OneTimeCode>,
        clock: Arc<dyn Clock>,
        margin_secs: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                endpoints,
                otp,
                clock,
                margin_secs,
                slot: Mutex::new(Slot::Empty),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.inner.endpoints
    }

    /// Number of re-authentication sequences started so far.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::Relaxed)
    }

    /// Returns a credential that is valid now, re-authenticating first when
    /// there is none or it has expired.
    pub async fn ensure_authenticated(&self) -> Result<Arc<Credential>, AuthenticationError> {
        let refresh = {
            let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match &*slot {
                Slot::Ready(cred)
                    if cred.is_valid_at(self.inner.clock.now_secs(), self.inner.margin_secs) =>
                {
                    return Ok(Arc::clone(cred));
                }
                Slot::Refreshing(refresh) => refresh.clone(),
                Slot::Ready(_) | Slot::Empty => {
                    let refresh = reauthenticate(Arc::clone(&self.inner)).boxed().shared();
                    *slot = Slot::Refreshing(refresh.clone());
                    refresh
                }
            }
        };
        refresh.await
    }

    /// Sends `request` with authorization headers composed from a credential
    /// that was valid at composition time. Non-2xx statuses are returned.
    pub async fn send_authenticated(
        &self,
        context: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse, MetadataError> {
        let credential = self.ensure_authenticated().await?;
        let mut request = request;
        for (name, value) in credential.headers() {
            request = request.header(&name, value);
        }
        self.inner
            .http
            .send(request)
            .await
            .map_err(|e| MetadataError::Http {
                context: context.to_string(),
                message: e.to_string(),
            })
    }
}

/// The full sequence; installs its own outcome in the slot when done.
async fn reauthenticate(inner: Arc<Inner>) -> Result<Arc<Credential>, AuthenticationError> {
    inner.refreshes.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("re-authenticating session");

    let outcome = run_auth_sequence(&inner).await.map(Arc::new);

    let mut slot = inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
    match &outcome {
        Ok(cred) => {
            tracing::info!(expires_at = cred.expires_at, "session authenticated");
            *slot = Slot::Ready(Arc::clone(cred));
        }
        Err(e) => {
            tracing::warn!("session authentication failed: {}", e);
            *slot = Slot::Empty;
        }
    }
    outcome
}

async fn run_auth_sequence(inner: &Inner) -> Result<Credential, AuthenticationError> {
    let http = &inner.http;
    let endpoints = &inner.endpoints;

    const SERVER_TIME: &str = "server time";
    let time = fetch_json(http, SERVER_TIME, HttpRequest::get(&endpoints.server_time)).await?;
    let server_time_ms = time
        .get("serverTime")
        .and_then(Value::as_f64)
        .map(|secs| (secs * 1000.0) as u64)
        .ok_or(AuthenticationError::MissingField {
            step: SERVER_TIME,
            field: "serverTime",
        })?;

    let code = inner.otp.generate(server_time_ms);
    let version = inner.otp.version().to_string();

    const ACCESS_TOKEN: &str = "access token";
    let request = HttpRequest::get(&endpoints.session_token)
        .query("reason", "init")
        .query("productType", "web-player")
        .query("totp", code.clone())
        .query("totpServer", code)
        .query("totpVer", version);
    let auth = fetch_json(http, ACCESS_TOKEN, request).await?;
    let access_token = non_empty_str(&auth, "accessToken", ACCESS_TOKEN)?;
    let expires_ms = auth
        .get("accessTokenExpirationTimestampMs")
        .and_then(Value::as_u64)
        .ok_or(AuthenticationError::MissingField {
            step: ACCESS_TOKEN,
            field: "accessTokenExpirationTimestampMs",
        })?;
    let client_id = non_empty_str(&auth, "clientId", ACCESS_TOKEN)?;

    const CLIENT_TOKEN: &str = "client token";
    let body = serde_json::json!({
        "client_data": {
            "client_version": CLIENT_VERSION,
            "client_id": client_id,
            "js_sdk_data": {}
        }
    });
    let request =
        HttpRequest::post_json(&endpoints.client_token, &body).header("Accept", "application/json");
    let granted = fetch_json(http, CLIENT_TOKEN, request).await?;
    let client_token = granted
        .pointer("/granted_token/token")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(AuthenticationError::MissingField {
            step: CLIENT_TOKEN,
            field: "granted_token.token",
        })?
        .to_string();

    let credential = Credential {
        access_token,
        expires_at: expires_ms / 1000,
        client_token,
    };
    let now = inner.clock.now_secs();
    if !credential.is_valid_at(now, inner.margin_secs) {
        return Err(AuthenticationError::Http {
            step: ACCESS_TOKEN,
            message: format!(
                "token already expired (expires_at {}, now {})",
                credential.expires_at, now
            ),
        });
    }
    Ok(credential)
}

async fn fetch_json(
    http: &HttpClient,
    step: &'static str,
    request: HttpRequest,
) -> Result<Value, AuthenticationError> {
    let response = http
        .send(request)
        .await
        .map_err(|e| AuthenticationError::Http {
            step,
            message: e.to_string(),
        })?;
    if !response.is_success() {
        return Err(AuthenticationError::Http {
            step,
            message: format!("HTTP {}", response.status),
        });
    }
    response.json().map_err(|e| AuthenticationError::Http {
        step,
        message: format!("invalid JSON: {e}"),
    })
}

fn non_empty_str(
    value: &Value,
    field: &'static str,
    step: &'static str,
) -> Result<String, AuthenticationError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(AuthenticationError::MissingField { step, field })
}
