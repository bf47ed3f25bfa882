//! HMAC signing for short-lived storage URLs.
//!
//! A signed URL carries `expires` (Unix seconds) and `sig`, the hex
//! HMAC-SHA256 of `"{key}|{expires}"`. Objects are never served without a
//! valid, unexpired signature.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::storage::SignedUrl;
use crate::types::Timestamp;

type HmacSha256 = Hmac<Sha256>;

fn message(key: &str, expires_at: i64) -> String {
    format!("{key}|{expires_at}")
}

fn mac_for(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length")
}

/// Compute the hex signature for `key` valid until `expires_at`.
pub fn sign_storage_key(secret: &[u8], key: &str, expires_at: i64) -> String {
    let mut mac = mac_for(secret);
    mac.update(message(key, expires_at).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check a signature in constant time and reject it once `now` has passed
/// `expires_at`.
pub fn verify_storage_signature(
    secret: &[u8],
    key: &str,
    expires_at: i64,
    signature: &str,
    now: i64,
) -> bool {
    if now > expires_at {
        return false;
    }
    let Some(raw) = hex::decode(signature) else {
        return false;
    };
    let mut mac = mac_for(secret);
    mac.update(message(key, expires_at).as_bytes());
    mac.verify_slice(&raw).is_ok()
}

// ---------------------------------------------------------------------------
// URL signer
// ---------------------------------------------------------------------------

/// Issues and checks `{base}/{key}?expires=..&sig=..` URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_path: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>, base_path: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_path: base_path.into().trim_end_matches('/').to_string(),
        }
    }

    /// Sign `key` for `ttl` starting at `now`.
    pub fn sign_at(&self, key: &str, ttl: Duration, now: Timestamp) -> SignedUrl {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = now.timestamp().saturating_add(ttl_secs);
        let expires_at = chrono::DateTime::from_timestamp(expires, 0).unwrap_or(now);
        let sig = sign_storage_key(&self.secret, key, expires);
        SignedUrl {
            url: format!("{}/{key}?expires={expires}&sig={sig}", self.base_path),
            expires_at,
        }
    }

    pub fn sign(&self, key: &str, ttl: Duration) -> SignedUrl {
        self.sign_at(key, ttl, chrono::Utc::now())
    }

    /// Check a signature from a request against the current time.
    pub fn verify(&self, key: &str, expires: i64, sig: &str) -> bool {
        verify_storage_signature(&self.secret, key, expires, sig, chrono::Utc::now().timestamp())
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string; `None` on odd length or non-hex input.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";

    #[test]
    fn signature_verifies_before_expiry() {
        let sig = sign_storage_key(SECRET, "7/1/pan.pdf", 1_000);
        assert_eq!(sig.len(), 64);
        assert!(verify_storage_signature(SECRET, "7/1/pan.pdf", 1_000, &sig, 999));
        assert!(verify_storage_signature(SECRET, "7/1/pan.pdf", 1_000, &sig, 1_000));
    }

    #[test]
    fn expired_signature_fails() {
        let sig = sign_storage_key(SECRET, "7/1/pan.pdf", 1_000);
        assert!(!verify_storage_signature(SECRET, "7/1/pan.pdf", 1_000, &sig, 1_001));
    }

    #[test]
    fn tampering_fails() {
        let sig = sign_storage_key(SECRET, "7/1/pan.pdf", 1_000);
        assert!(!verify_storage_signature(SECRET, "8/1/pan.pdf", 1_000, &sig, 0));
        assert!(!verify_storage_signature(SECRET, "7/1/pan.pdf", 2_000, &sig, 0));
        assert!(!verify_storage_signature(b"other", "7/1/pan.pdf", 1_000, &sig, 0));
        assert!(!verify_storage_signature(SECRET, "7/1/pan.pdf", 1_000, "zz", 0));
        assert!(!verify_storage_signature(SECRET, "7/1/pan.pdf", 1_000, "abc", 0));
    }

    #[test]
    fn signer_builds_verifiable_urls() {
        use chrono::TimeZone;

        let signer = UrlSigner::new(SECRET, "/files/");
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let signed = signer.sign_at("7/1/pan.pdf", Duration::from_secs(300), now);

        let expires = now.timestamp() + 300;
        assert_eq!(signed.expires_at.timestamp(), expires);
        assert!(signed
            .url
            .starts_with(&format!("/files/7/1/pan.pdf?expires={expires}&sig=")));

        let sig = signed.url.rsplit_once("sig=").unwrap().1;
        assert!(verify_storage_signature(SECRET, "7/1/pan.pdf", expires, sig, expires));
    }
}
