//! DRM license exchange seen as a black box: a PSSH blob goes in, keys come out.

mod remote_cdm;

use std::fmt;

use async_trait::async_trait;

use crate::error::MetadataError;

pub use remote_cdm::RemoteCdm;

/// Kind of a key returned by a license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    Signing,
    Content,
    OperatorSession,
    Entitlement,
    Other(String),
}

impl KeyKind {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "SIGNING" => KeyKind::Signing,
            "CONTENT" => KeyKind::Content,
            "OPERATOR_SESSION" => KeyKind::OperatorSession,
            "ENTITLEMENT" => KeyKind::Entitlement,
            _ => KeyKind::Other(s.to_string()),
        }
    }
}

/// One key from a parsed license.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey {
    pub kid: String,
    pub key: Vec<u8>,
    pub kind: KeyKind,
}

impl ContentKey {
    /// Lowercase hex, as the decrypt tool expects it.
    pub fn key_hex(&self) -> String {
        hex::encode(&self.key)
    }

    /// The first CONTENT key, if any.
    pub fn find_content(keys: Vec<ContentKey>) -> Option<ContentKey> {
        keys.into_iter().find(|k| k.kind == KeyKind::Content)
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentKey")
            .field("kid", &self.kid)
            .field("kind", &self.kind)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Handle of one open CDM session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSession(pub String);

/// Challenge/response license exchange. Every failure is surfaced.
#[async_trait]
pub trait LicenseService: Send + Sync {
    async fn open(&self) -> Result<LicenseSession, MetadataError>;

    /// License request blob for a base64 PSSH box.
    async fn challenge(&self, session: &LicenseSession, pssh: &str)
        -> Result<Vec<u8>, MetadataError>;

    /// Feeds the license server's response back and returns the keys it unlocked.
    async fn parse_license(
        &self,
        session: &LicenseSession,
        license: &[u8],
    ) -> Result<Vec<ContentKey>, MetadataError>;

    async fn close(&self, session: LicenseSession) -> Result<(), MetadataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kind: KeyKind, byte: u8) -> ContentKey {
        ContentKey {
            kid: format!("{byte:02x}"),
            key: vec![byte; 16],
            kind,
        }
    }

    #[test]
    fn picks_the_content_key() {
        let keys = vec![key(KeyKind::Signing, 1), key(KeyKind::Content, 2)];
        let found = ContentKey::find_content(keys).unwrap();
        assert_eq!(found.key_hex(), "02".repeat(16));
    }

    #[test]
    fn no_content_key() {
        assert!(ContentKey::find_content(vec![key(KeyKind::Signing, 1)]).is_none());
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!(KeyKind::parse("content"), KeyKind::Content);
        assert_eq!(KeyKind::parse("OPERATOR_SESSION"), KeyKind::OperatorSession);
        assert_eq!(KeyKind::parse("WEIRD"), KeyKind::Other("WEIRD".to_string()));
    }

    #[test]
    fn debug_redacts_key_material() {
        let s = format!("{:?}", key(KeyKind::Content, 0xab));
        assert!(!s.contains("171"));
        assert!(s.contains("redacted"));
    }
}
