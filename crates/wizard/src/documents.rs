//! Document sub-flow: checked uploads into object storage plus the metadata
//! row, one slot per document type.
//!
//! Uploads bypass autosave. The object is written first, then the row is
//! upserted on `(onboarding, type)`, so a re-upload replaces the previous
//! entry instead of adding one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use workbridge_core::gateway::{NewDocument, OnboardingGateway};
use workbridge_core::rate_limit::UploadRateLimiter;
use workbridge_core::steps::documents::{OPTIONAL_DOCUMENT_TYPES, REQUIRED_DOCUMENT_TYPES};
use workbridge_core::steps::{DocumentEntry, DocumentType, DocumentsData};
use workbridge_core::storage::{ObjectStorage, SignedUrl};
use workbridge_core::types::DbId;
use workbridge_core::uploads::{
    document_storage_key, mime_for_extension, photo_storage_key, sanitize_filename,
    validate_document_file, validate_photo_file, FileCandidate, UploadLimits, UploadRejection,
};

use crate::error::WizardError;

/// Per-type upload state. Progress is indeterminate: a slot is either
/// uploading or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadSlot {
    Empty,
    Uploading,
    Uploaded,
    Failed { reason: String },
}

pub struct DocumentFlow {
    gateway: Arc<dyn OnboardingGateway>,
    storage: Arc<dyn ObjectStorage>,
    limiter: Arc<UploadRateLimiter>,
    limits: UploadLimits,
    user_id: DbId,
    onboarding_id: DbId,
    slots: BTreeMap<DocumentType, UploadSlot>,
}

impl DocumentFlow {
    pub fn new(
        gateway: Arc<dyn OnboardingGateway>,
        storage: Arc<dyn ObjectStorage>,
        limiter: Arc<UploadRateLimiter>,
        limits: UploadLimits,
        user_id: DbId,
        onboarding_id: DbId,
        existing: &DocumentsData,
    ) -> Self {
        let slots = REQUIRED_DOCUMENT_TYPES
            .into_iter()
            .chain(OPTIONAL_DOCUMENT_TYPES)
            .map(|ty| {
                let slot = if existing.get(ty).is_some() {
                    UploadSlot::Uploaded
                } else {
                    UploadSlot::Empty
                };
                (ty, slot)
            })
            .collect();

        Self {
            gateway,
            storage,
            limiter,
            limits,
            user_id,
            onboarding_id,
            slots,
        }
    }

    pub fn slots(&self) -> &BTreeMap<DocumentType, UploadSlot> {
        &self.slots
    }

    pub fn slot(&self, document_type: DocumentType) -> &UploadSlot {
        self.slots.get(&document_type).unwrap_or(&UploadSlot::Empty)
    }

    fn set_slot(&mut self, document_type: DocumentType, slot: UploadSlot) {
        self.slots.insert(document_type, slot);
    }

    /// Run the pre-upload checks: type, size, rate, then name length.
    pub fn validate(&self, file: &FileCandidate) -> Result<String, UploadRejection> {
        validate_document_file(file, &self.limits, &self.limiter, self.onboarding_id)
    }

    /// Check, store and record one document.
    ///
    /// `previous` is the entry currently held for this type; if its object
    /// sits under a different key (another extension) it is removed after
    /// the new row is written.
    pub async fn upload(
        &mut self,
        document_type: DocumentType,
        file_name: &str,
        bytes: &[u8],
        previous: Option<&DocumentEntry>,
    ) -> Result<DocumentEntry, WizardError> {
        let file = FileCandidate {
            file_name: file_name.to_string(),
            size: bytes.len() as u64,
        };

        let ext = match self.validate(&file) {
            Ok(ext) => ext,
            Err(rejection) => {
                tracing::warn!(
                    onboarding_id = self.onboarding_id,
                    document_type = document_type.as_str(),
                    reason = rejection.code(),
                    "Upload rejected"
                );
                self.set_slot(
                    document_type,
                    UploadSlot::Failed {
                        reason: rejection.code().to_string(),
                    },
                );
                return Err(rejection.into());
            }
        };

        self.set_slot(document_type, UploadSlot::Uploading);

        let key = document_storage_key(self.user_id, self.onboarding_id, document_type, &ext);
        let mime_type = mime_for_extension(&ext);
        let stored = self
            .store(document_type, &sanitize_filename(file_name), &key, bytes, mime_type)
            .await;
        let entry = match stored {
            Ok(entry) => entry,
            Err(e) => {
                self.set_slot(
                    document_type,
                    UploadSlot::Failed {
                        reason: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        if let Some(old) = previous.filter(|old| old.storage_key != entry.storage_key) {
            self.cleanup(&old.storage_key).await;
        }

        self.set_slot(document_type, UploadSlot::Uploaded);
        tracing::info!(
            onboarding_id = self.onboarding_id,
            document_type = document_type.as_str(),
            size = entry.file_size,
            "Document uploaded"
        );
        Ok(entry)
    }

    async fn store(
        &self,
        document_type: DocumentType,
        file_name: &str,
        key: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<DocumentEntry, WizardError> {
        self.storage.put(key, bytes, mime_type).await?;
        let doc = NewDocument {
            document_type,
            file_name: file_name.to_string(),
            storage_key: key.to_string(),
            file_size: bytes.len() as i64,
            mime_type: mime_type.to_string(),
        };
        Ok(self.gateway.upsert_document(self.onboarding_id, &doc).await?)
    }

    /// Remove the stored object, then the row.
    ///
    /// Object removal is best effort: a failure is logged and the row is
    /// deleted anyway. Returns whether a row existed.
    pub async fn remove(&mut self, document_type: DocumentType) -> Result<bool, WizardError> {
        if let Some(entry) = self
            .gateway
            .find_document(self.onboarding_id, document_type)
            .await?
        {
            self.cleanup(&entry.storage_key).await;
        }
        let existed = self
            .gateway
            .delete_document(self.onboarding_id, document_type)
            .await?;
        self.set_slot(document_type, UploadSlot::Empty);
        tracing::info!(
            onboarding_id = self.onboarding_id,
            document_type = document_type.as_str(),
            existed,
            "Document removed"
        );
        Ok(existed)
    }

    /// Check, store and record the profile photo. Returns the storage key.
    pub async fn upload_photo(
        &self,
        file_name: &str,
        bytes: &[u8],
        previous_key: Option<&str>,
    ) -> Result<String, WizardError> {
        let file = FileCandidate {
            file_name: file_name.to_string(),
            size: bytes.len() as u64,
        };
        let ext = validate_photo_file(&file, &self.limits).inspect_err(|rejection| {
            tracing::warn!(
                onboarding_id = self.onboarding_id,
                reason = rejection.code(),
                "Profile photo rejected"
            );
        })?;

        let key = photo_storage_key(self.user_id, self.onboarding_id, &ext);
        self.storage
            .put(&key, bytes, mime_for_extension(&ext))
            .await?;
        self.gateway
            .set_profile_photo(self.onboarding_id, &key)
            .await?;

        if let Some(old) = previous_key.filter(|old| *old != key) {
            self.cleanup(old).await;
        }
        tracing::info!(onboarding_id = self.onboarding_id, "Profile photo uploaded");
        Ok(key)
    }

    pub async fn signed_url(&self, key: &str, ttl: Duration) -> Result<SignedUrl, WizardError> {
        Ok(self.storage.signed_url(key, ttl).await?)
    }

    async fn cleanup(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            let err = WizardError::StorageCleanupFailed(e.to_string());
            tracing::warn!(
                onboarding_id = self.onboarding_id,
                key,
                error = %err,
                "Continuing after storage cleanup failure"
            );
        }
    }
}
