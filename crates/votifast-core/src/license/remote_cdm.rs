//! Client for a pywidevine-compatible remote CDM HTTP API.
//!
//! Every response is an envelope `{"status": 200, "message": "...", "data": {...}}`;
//! a status other than 200 is an error even when the HTTP status is 2xx.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use super::{ContentKey, KeyKind, LicenseService, LicenseSession};
use crate::error::MetadataError;
use crate::http::{HttpClient, HttpRequest};

pub struct RemoteCdm {
    http: HttpClient,
    host: String,
    device: String,
}

impl RemoteCdm {
    pub fn new(host: &str, device: &str, secret: &str) -> Self {
        Self {
            http: HttpClient::new().with_default_header("X-Secret-Key", secret),
            host: host.trim_end_matches('/').to_string(),
            device: device.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.host, self.device, path)
    }

    async fn call(&self, what: &str, request: HttpRequest) -> Result<Value, MetadataError> {
        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| MetadataError::License(format!("{what}: {e}")))?;
        let envelope: Value = response.json().map_err(|e| {
            MetadataError::License(format!("{what}: HTTP {} with invalid JSON: {e}", response.status))
        })?;
        let status = envelope.get("status").and_then(Value::as_u64).unwrap_or(0);
        if !response.is_success() || status != 200 {
            let message = envelope
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            return Err(MetadataError::License(format!(
                "{what}: status {status}: {message}"
            )));
        }
        Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
    }
}

fn data_str<'a>(data: &'a Value, field: &str, what: &str) -> Result<&'a str, MetadataError> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| MetadataError::License(format!("{what}: missing `{field}`")))
}

#[async_trait]
impl LicenseService for RemoteCdm {
    async fn open(&self) -> Result<LicenseSession, MetadataError> {
        let data = self.call("open", HttpRequest::get(self.url("open"))).await?;
        let id = data_str(&data, "session_id", "open")?;
        tracing::debug!(session = id, "cdm session opened");
        Ok(LicenseSession(id.to_string()))
    }

    async fn challenge(
        &self,
        session: &LicenseSession,
        pssh: &str,
    ) -> Result<Vec<u8>, MetadataError> {
        let body = json!({
            "session_id": session.0,
            "init_data": pssh,
            "privacy_mode": true,
        });
        let request =
            HttpRequest::post_json(self.url("get_license_challenge/STREAMING"), &body);
        let data = self.call("challenge", request).await?;
        let b64 = data_str(&data, "challenge_b64", "challenge")?;
        BASE64
            .decode(b64)
            .map_err(|e| MetadataError::License(format!("challenge: bad base64: {e}")))
    }

    async fn parse_license(
        &self,
        session: &LicenseSession,
        license: &[u8],
    ) -> Result<Vec<ContentKey>, MetadataError> {
        let body = json!({
            "session_id": session.0,
            "license_message": BASE64.encode(license),
        });
        self.call(
            "parse_license",
            HttpRequest::post_json(self.url("parse_license"), &body),
        )
        .await?;

        let body = json!({ "session_id": session.0 });
        let data = self
            .call("get_keys", HttpRequest::post_json(self.url("get_keys/ALL"), &body))
            .await?;
        let keys = data
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| MetadataError::License("get_keys: missing `keys`".to_string()))?;

        keys.iter()
            .map(|k| {
                let kid = data_str(k, "key_id", "get_keys")?.to_string();
                let key = hex::decode(data_str(k, "key", "get_keys")?)
                    .map_err(|e| MetadataError::License(format!("get_keys: bad hex key: {e}")))?;
                let kind = KeyKind::parse(data_str(k, "type", "get_keys")?);
                Ok(ContentKey { kid, key, kind })
            })
            .collect()
    }

    async fn close(&self, session: LicenseSession) -> Result<(), MetadataError> {
        self.call(
            "close",
            HttpRequest::get(self.url(&format!("close/{}", session.0))),
        )
        .await?;
        Ok(())
    }
}
