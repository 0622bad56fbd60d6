//! The credential bundle and the clock it is checked against.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token, its absolute expiry (seconds since epoch) and the client
/// token. Replaced as a whole on re-authentication, never edited in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: u64,
    pub client_token: String,
}

impl Credential {
    /// Usable at `now` iff `now + margin < expires_at`.
    pub fn is_valid_at(&self, now: u64, margin_secs: u64) -> bool {
        now.saturating_add(margin_secs) < self.expires_at
    }

    /// Headers authorizing one request with this credential.
    pub fn headers(&self) -> [(String, String); 2] {
        [
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.access_token),
            ),
            ("Client-Token".to_string(), self.client_token.clone()),
        ]
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("client_token", &"<redacted>")
            .finish()
    }
}

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
