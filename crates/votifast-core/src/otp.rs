//! One-time code derivation for the token endpoint.
//!
//! The session only depends on [`OneTimeCode`]; [`Totp`] is the scheme the
//! web player uses (RFC 6238, HMAC-SHA1, 30 second step, 6 digits) keyed by a
//! versioned secret that is published as obfuscated byte lists.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;

/// Opaque code generator: a version plus a function of a timestamp.
pub trait OneTimeCode: Send + Sync {
    /// Version sent alongside the code (`totpVer`).
    fn version(&self) -> u32;
    /// Code for the given server time in milliseconds since the epoch.
    fn generate(&self, timestamp_ms: u64) -> String;
}

#[derive(Debug, Clone)]
pub struct Totp {
    version: u32,
    secret: Vec<u8>,
}

impl Totp {
    /// Builds a generator from an already-derived secret.
    pub fn new(version: u32, secret: Vec<u8>) -> Self {
        Self { version, secret }
    }

    /// Builds a generator from one obfuscated cipher list: each byte is
    /// XOR-ed with `(i % 33) + 9` and the results are joined as decimal text.
    pub fn from_cipher(version: u32, cipher: &[u8]) -> Self {
        let joined: String = cipher
            .iter()
            .enumerate()
            .map(|(i, c)| (c ^ ((i % 33) as u8 + 9)).to_string())
            .collect();
        Self::new(version, joined.into_bytes())
    }

    /// Picks the highest version from a `{"version": [bytes..]}` secrets map.
    pub fn from_secrets(secrets: &BTreeMap<String, Vec<u8>>) -> Option<Self> {
        secrets
            .iter()
            .filter_map(|(v, cipher)| v.parse::<u32>().ok().map(|v| (v, cipher)))
            .max_by_key(|(v, _)| *v)
            .map(|(v, cipher)| Self::from_cipher(v, cipher))
    }
}

impl OneTimeCode for Totp {
    fn version(&self) -> u32 {
        self.version
    }

    fn generate(&self, timestamp_ms: u64) -> String {
        let counter = (timestamp_ms / 1000) / STEP_SECS;
        // HMAC accepts keys of any length; `new_from_slice` cannot fail for it.
        let mut mac = match HmacSha1::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = ((digest[offset] as u32 & 0x7f) << 24)
            | ((digest[offset + 1] as u32) << 16)
            | ((digest[offset + 2] as u32) << 8)
            | (digest[offset + 3] as u32);
        let code = binary % 10u32.pow(DIGITS);
        format!("{:0width$}", code, width = DIGITS as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc6238_sha1_vectors_truncated_to_six_digits() {
        let totp = Totp::new(1, b"12345678901234567890".to_vec());
        assert_eq!(totp.generate(59_000), "287082");
        assert_eq!(totp.generate(1_111_111_109_000), "081804");
        assert_eq!(totp.generate(1_234_567_890_000), "005924");
    }

    #[test]
    fn same_window_same_code() {
        let totp = Totp::new(1, b"secret".to_vec());
        assert_eq!(totp.generate(60_000), totp.generate(89_999));
        assert_eq!(totp.generate(60_000).len(), 6);
    }

    #[test]
    fn cipher_is_deobfuscated_to_decimal_text() {
        // 9 ^ 9 = 0, 11 ^ 10 = 1, 9 ^ 11 = 2
        let totp = Totp::from_cipher(3, &[9, 11, 9]);
        assert_eq!(totp.secret, b"012".to_vec());
        assert_eq!(totp.version(), 3);
    }

    #[test]
    fn from_secrets_picks_highest_numeric_version() {
        let mut secrets = BTreeMap::new();
        secrets.insert("9".to_string(), vec![1, 2, 3]);
        secrets.insert("12".to_string(), vec![4, 5, 6]);
        secrets.insert("x".to_string(), vec![7]);
        let totp = Totp::from_secrets(&secrets).unwrap();
        assert_eq!(totp.version(), 12);
    }
}
