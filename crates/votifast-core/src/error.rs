//! Error taxonomy for the session, catalog and job pipeline.
//!
//! Per-job errors (`DownloadError`, `DecryptionError`) are `Clone` because they
//! travel through completion signals that may have several observers.
//! `AuthenticationError` is `Clone` for the same reason: every caller coalesced
//! onto one credential refresh receives the same failure.

use thiserror::Error;

/// Re-authentication failed. Fatal to the session; never retried here.
#[derive(Debug, Clone, Error)]
pub enum AuthenticationError {
    /// Transport failure or non-2xx status during the auth sequence.
    #[error("{step}: {message}")]
    Http { step: &'static str, message: String },
    /// A response was missing a field the sequence depends on.
    #[error("{step}: missing field `{field}`")]
    MissingField {
        step: &'static str,
        field: &'static str,
    },
}

/// Enqueue was attempted after the queue was shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is shut down")]
pub struct QueueClosed;

/// A metadata or license request failed.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthenticationError),
    #[error("{context}: {message}")]
    Http { context: String, message: String },
    #[error("{context}: HTTP {status}")]
    Status { context: String, status: u32 },
    #[error("{context}: invalid JSON: {message}")]
    Json { context: String, message: String },
    #[error("{context}: missing or malformed field `{field}`")]
    MissingField { context: String, field: String },
    #[error("license service: {0}")]
    License(String),
    #[error("no CONTENT key in license for file {0}")]
    NoContentKey(String),
}

/// A download job failed. Attached to the job's completion signal.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("transfer failed: {0}")]
    Transfer(String),
    #[error("server returned HTTP {0}")]
    Status(u32),
    #[error("storage: {0}")]
    Storage(String),
    #[error("worker dropped the job without reporting a result")]
    Abandoned,
}

/// A decrypt job failed. The interim artifact is kept for a later resume.
#[derive(Debug, Clone, Error)]
pub enum DecryptionError {
    #[error("could not obtain key: {0}")]
    Key(#[from] MetadataError),
    #[error("decrypt tool could not be started: {0}")]
    Spawn(String),
    #[error("preparing output: {0}")]
    Output(String),
    #[error("decrypt tool exited with {code:?}: {stderr}")]
    Tool { code: Option<i32>, stderr: String },
    #[error("removing interim artifact: {0}")]
    Cleanup(String),
    #[error("worker dropped the job without reporting a result")]
    Abandoned,
}

/// Lets a completion signal report an owner that went away unfulfilled.
pub trait AbandonedError {
    fn abandoned() -> Self;
}

impl AbandonedError for DownloadError {
    fn abandoned() -> Self {
        DownloadError::Abandoned
    }
}

impl AbandonedError for DecryptionError {
    fn abandoned() -> Self {
        DecryptionError::Abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_wraps_into_metadata_error() {
        let auth = AuthenticationError::MissingField {
            step: "access token",
            field: "accessToken",
        };
        let meta: MetadataError = auth.into();
        assert!(matches!(meta, MetadataError::Auth(_)));
        assert!(meta.to_string().contains("accessToken"));
    }

    #[test]
    fn decrypt_tool_error_mentions_exit_code() {
        let e = DecryptionError::Tool {
            code: Some(1),
            stderr: "Invalid data found".to_string(),
        };
        let s = e.to_string();
        assert!(s.contains("Some(1)"));
        assert!(s.contains("Invalid data found"));
    }
}
