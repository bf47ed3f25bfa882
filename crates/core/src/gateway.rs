//! Persistence seam for the onboarding wizard.
//!
//! The gateway is the only component that reads or writes the onboarding
//! record and its child resources. Every write is an upsert or a
//! delete-then-insert, so replaying the latest payload for a step is safe.

use async_trait::async_trait;
use serde::Serialize;

use crate::onboarding_wizard::{OnboardingStatus, WizardStep};
use crate::steps::{DocumentEntry, DocumentType, StepData, WizardSnapshot};
use crate::types::{DbId, Timestamp};

/// The root onboarding row, one per worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub current_step: WizardStep,
    pub status: OnboardingStatus,
    pub submitted_at: Option<Timestamp>,
}

/// Metadata for a freshly stored document, before it has a row id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub document_type: DocumentType,
    pub file_name: String,
    pub storage_key: String,
    pub file_size: i64,
    pub mime_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{entity} not found for onboarding {onboarding_id}")]
    NotFound {
        entity: &'static str,
        onboarding_id: DbId,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
    /// Wrap any backend failure.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

#[async_trait]
pub trait OnboardingGateway: Send + Sync {
    /// Return the worker's onboarding record, creating a `draft` at step 1
    /// on first visit.
    async fn load_or_create(&self, user_id: DbId) -> Result<OnboardingRecord, GatewayError>;

    /// Load every step's persisted data for `onboarding_id`.
    ///
    /// List-valued steps with no rows come back as `None` so callers can
    /// tell "never saved" from "saved empty" where it matters.
    async fn hydrate(&self, onboarding_id: DbId) -> Result<WizardSnapshot, GatewayError>;

    /// Persist one step's data.
    ///
    /// Profile and Preferences upsert their single row; Skills (with
    /// certifications), WorkHistory and Languages delete all rows and insert
    /// the new set. Documents and Review carry nothing to write.
    async fn save_step(&self, onboarding_id: DbId, data: &StepData) -> Result<(), GatewayError>;

    async fn update_current_step(
        &self,
        onboarding_id: DbId,
        step: WizardStep,
    ) -> Result<(), GatewayError>;

    /// Record the storage key of the profile photo, creating the profile
    /// row if needed.
    async fn set_profile_photo(
        &self,
        onboarding_id: DbId,
        storage_key: &str,
    ) -> Result<(), GatewayError>;

    /// Insert or replace the document for `(onboarding_id, document_type)`.
    async fn upsert_document(
        &self,
        onboarding_id: DbId,
        doc: &NewDocument,
    ) -> Result<DocumentEntry, GatewayError>;

    async fn find_document(
        &self,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<Option<DocumentEntry>, GatewayError>;

    /// Delete the document row; returns whether a row existed.
    async fn delete_document(
        &self,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<bool, GatewayError>;

    /// Move a `draft` record to `pending_verification`, stamp
    /// `submitted_at`, and write the `onboarding_submitted` audit event.
    ///
    /// Fails with [`GatewayError::Conflict`] if the record is not a draft.
    async fn submit(
        &self,
        onboarding_id: DbId,
        actor_id: DbId,
    ) -> Result<OnboardingRecord, GatewayError>;
}
