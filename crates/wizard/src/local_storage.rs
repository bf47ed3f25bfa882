//! Filesystem-backed object storage.
//!
//! Objects live under `root/{key}`. Nothing under `root` is served directly;
//! reads over HTTP go through URLs issued by [`ObjectStorage::signed_url`]
//! and checked with the same [`UrlSigner`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use workbridge_core::signing::UrlSigner;
use workbridge_core::storage::{validate_storage_key, ObjectStorage, SignedUrl, StorageError};

pub struct LocalObjectStorage {
    root: PathBuf,
    signer: UrlSigner,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            root: root.into(),
            signer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_storage_key(key)?;
        Ok(self.root.join(key))
    }
}

fn not_found_as(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Io(e),
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(not_found_as(key))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path).await.map_err(not_found_as(key))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<SignedUrl, StorageError> {
        let path = self.path_for(key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(self.signer.sign(key, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn storage(dir: &tempfile::TempDir) -> LocalObjectStorage {
        LocalObjectStorage::new(dir.path(), UrlSigner::new(b"secret".to_vec(), "/files"))
    }

    #[tokio::test]
    async fn put_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.put("7/1/pan.pdf", b"%PDF-1.7", "application/pdf").await.unwrap();

        assert!(dir.path().join("7/1/pan.pdf").is_file());
        assert_eq!(storage.get("7/1/pan.pdf").await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.put("7/1/pan.pdf", b"one", "application/pdf").await.unwrap();
        storage.put("7/1/pan.pdf", b"two", "application/pdf").await.unwrap();
        assert_eq!(storage.get("7/1/pan.pdf").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert_matches!(storage.get("7/1/pan.pdf").await, Err(StorageError::NotFound(_)));
        assert_matches!(storage.remove("7/1/pan.pdf").await, Err(StorageError::NotFound(_)));
        assert_matches!(
            storage.signed_url("7/1/pan.pdf", Duration::from_secs(60)).await,
            Err(StorageError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn remove_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.put("7/1/visa.png", b"png", "image/png").await.unwrap();
        storage.remove("7/1/visa.png").await.unwrap();
        assert!(!dir.path().join("7/1/visa.png").exists());
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert_matches!(
            storage.put("../outside.pdf", b"x", "application/pdf").await,
            Err(StorageError::InvalidKey(_))
        );
        assert_matches!(
            storage.get("/etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        );
    }

    #[tokio::test]
    async fn signed_url_points_at_the_download_route() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.put("7/1/pan.pdf", b"%PDF", "application/pdf").await.unwrap();

        let signed = storage
            .signed_url("7/1/pan.pdf", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(signed.url.starts_with("/files/7/1/pan.pdf?expires="));
        assert!(signed.url.contains("&sig="));
        assert!(signed.expires_at > chrono::Utc::now());
    }
}
