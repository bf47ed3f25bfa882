//! KYC document row.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::error::CoreError;
use workbridge_core::steps::{DocumentEntry, DocumentStatus, DocumentType};
use workbridge_core::types::{DbId, Timestamp};

/// A row from the `onboarding_documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingDocument {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub document_type: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub storage_key: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OnboardingDocument {
    pub fn into_entry(self) -> Result<DocumentEntry, CoreError> {
        Ok(DocumentEntry {
            id: self.id,
            onboarding_id: self.onboarding_id,
            document_type: DocumentType::from_str_db(&self.document_type)?,
            file_name: self.file_name,
            storage_key: self.storage_key,
            file_size: self.file_size,
            mime_type: self.mime_type,
            status: DocumentStatus::from_str_db(&self.status)?,
        })
    }
}
