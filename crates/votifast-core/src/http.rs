//! Minimal HTTP client over libcurl easy handles.
//!
//! Every transfer runs on `spawn_blocking` so async workers never stall on
//! network I/O. Request bodies and responses for API calls are small and
//! buffered; large media transfers go through `stream_to` instead, which hands
//! each received chunk to a callback and never holds the whole body.

use std::collections::BTreeMap;
use std::str;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Transport-level failure (no HTTP status available).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Only produced by `stream_to`, which refuses error bodies.
    #[error("HTTP {0}")]
    Status(u32),
    #[error("transfer task join: {0}")]
    Join(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing request. Headers given here override the client's defaults.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// POST with a JSON body and matching `Content-Type`.
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::post(url, body.to_string().into_bytes()).header("Content-Type", "application/json")
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Full URL with query parameters percent-encoded.
    pub fn full_url(&self) -> Result<String, HttpError> {
        let mut url = url::Url::parse(&self.url).map_err(|e| HttpError::InvalidUrl {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &self.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url.into())
    }
}

/// Buffered response of an API call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Cheap-to-clone client carrying default headers and timeouts.
#[derive(Debug, Clone)]
pub struct HttpClient {
    default_headers: Arc<BTreeMap<String, String>>,
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            default_headers: Arc::new(BTreeMap::new()),
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
        }
    }

    /// Adds (or replaces) a header sent with every request.
    pub fn with_default_header(mut self, name: &str, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.default_headers).insert(name.to_string(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends a request and buffers the response body. Non-2xx statuses are
    /// returned as responses, not errors; callers decide what a status means.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.send_blocking(&request))
            .await
            .map_err(|e| HttpError::Join(e.to_string()))?
    }

    /// Blocking variant of `send`; call from `spawn_blocking` in async code.
    pub fn send_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut body = Vec::new();
        let mut easy = self.prepare(request, Some(self.timeout))?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let status = easy.response_code()?;
        Ok(HttpResponse { status, body })
    }

    /// Streams a GET response into `on_chunk`, one call per received chunk.
    /// Fails on HTTP status >= 400 before any body byte is delivered.
    /// `on_chunk` returning `false` aborts the transfer (a curl write error).
    /// Returns the final status. Blocking; run from `spawn_blocking`.
    pub fn stream_to<F>(
        &self,
        url: &str,
        timeout: Option<Duration>,
        mut on_chunk: F,
    ) -> Result<u32, HttpError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let request = HttpRequest::get(url);
        let mut easy = self.prepare(&request, timeout)?;
        easy.fail_on_error(true)?;
        // Abort if throughput drops below 1 KiB/s for 60s instead of hanging forever.
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if on_chunk(data) {
                    Ok(data.len())
                } else {
                    Ok(0)
                }
            })?;
            if let Err(e) = transfer.perform() {
                drop(transfer);
                if e.is_http_returned_error() {
                    return Err(HttpError::Status(easy.response_code()?));
                }
                return Err(e.into());
            }
        }
        Ok(easy.response_code()?)
    }

    fn prepare(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<curl::easy::Easy, HttpError> {
        let url = request.full_url()?;
        let mut easy = curl::easy::Easy::new();
        easy.url(&url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        if let Some(t) = timeout {
            easy.timeout(t)?;
        }

        let mut merged: BTreeMap<String, String> = (*self.default_headers).clone();
        for (k, v) in &request.headers {
            merged.insert(k.clone(), v.clone());
        }

        if let Some(body) = &request.body {
            easy.post(true)?;
            easy.post_fields_copy(body)?;
            // libcurl otherwise sends `Expect: 100-continue` for larger bodies.
            merged.insert("Expect".to_string(), String::new());
        }

        let mut list = curl::easy::List::new();
        for (k, v) in &merged {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !merged.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_encodes_query() {
        let req = HttpRequest::get("https://example.com/api/token")
            .query("reason", "init")
            .query("totp", "12 34");
        assert_eq!(
            req.full_url().unwrap(),
            "https://example.com/api/token?reason=init&totp=12+34"
        );
    }

    #[test]
    fn full_url_rejects_garbage() {
        let req = HttpRequest::get("not a url");
        assert!(matches!(req.full_url(), Err(HttpError::InvalidUrl { .. })));
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("https://example.com/", &serde_json::json!({"a": 1}));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/json"));
    }

    #[test]
    fn response_status_classification() {
        let ok = HttpResponse { status: 204, body: Vec::new() };
        let not_found = HttpResponse { status: 404, body: Vec::new() };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }
}
