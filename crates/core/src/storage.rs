//! Object storage seam for onboarding attachments.
//!
//! Keys are opaque relative paths such as `7/42/pan.pdf`. Callers never
//! expose a key as a public URL; display goes through [`ObjectStorage::signed_url`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A time-limited URL for one object.
#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: Timestamp,
}

/// Put/get/remove by key, plus short-lived URL issuance.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Read the object stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete the object under `key`. Deleting a missing object is an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Issue a URL that grants read access to `key` for `ttl`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<SignedUrl, StorageError>;
}

/// Reject keys that could escape the storage root.
///
/// Valid keys are non-empty, relative, use `/` separators only, and contain
/// no empty, `.` or `..` segments.
pub fn validate_storage_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
