//! Documents step: KYC attachments keyed by document type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FieldError, StepValidator, ValidationContext};
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    AadhaarFront,
    AadhaarBack,
    Pan,
    Passport,
    Visa,
}

/// Types that must be uploaded before the wizard can be submitted.
pub const REQUIRED_DOCUMENT_TYPES: [DocumentType; 3] = [
    DocumentType::AadhaarFront,
    DocumentType::AadhaarBack,
    DocumentType::Pan,
];

/// Types the worker may upload but is not required to.
pub const OPTIONAL_DOCUMENT_TYPES: [DocumentType; 2] =
    [DocumentType::Passport, DocumentType::Visa];

impl DocumentType {
    /// Parse a document type string from the database or a URL segment.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "aadhaar_front" => Ok(Self::AadhaarFront),
            "aadhaar_back" => Ok(Self::AadhaarBack),
            "pan" => Ok(Self::Pan),
            "passport" => Ok(Self::Passport),
            "visa" => Ok(Self::Visa),
            _ => Err(CoreError::Validation(format!(
                "Invalid document type '{s}'. Must be one of: aadhaar_front, \
                 aadhaar_back, pan, passport, visa"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AadhaarFront => "aadhaar_front",
            Self::AadhaarBack => "aadhaar_back",
            Self::Pan => "pan",
            Self::Passport => "passport",
            Self::Visa => "visa",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AadhaarFront => "Aadhaar Card (Front)",
            Self::AadhaarBack => "Aadhaar Card (Back)",
            Self::Pan => "PAN Card",
            Self::Passport => "Passport",
            Self::Visa => "Visa",
        }
    }

    pub fn is_required(&self) -> bool {
        REQUIRED_DOCUMENT_TYPES.contains(self)
    }
}

/// Verification status of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid document status '{s}'. Must be one of: uploaded, approved, rejected"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One stored artifact. `storage_key` is opaque and never a public URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub document_type: DocumentType,
    pub file_name: String,
    pub storage_key: String,
    pub file_size: i64,
    pub mime_type: String,
    pub status: DocumentStatus,
}

/// The documents step: at most one active entry per type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentsData {
    pub documents: BTreeMap<DocumentType, DocumentEntry>,
}

impl DocumentsData {
    /// Insert or replace the entry for its type.
    pub fn insert(&mut self, entry: DocumentEntry) -> Option<DocumentEntry> {
        self.documents.insert(entry.document_type, entry)
    }

    pub fn remove(&mut self, document_type: DocumentType) -> Option<DocumentEntry> {
        self.documents.remove(&document_type)
    }

    pub fn get(&self, document_type: DocumentType) -> Option<&DocumentEntry> {
        self.documents.get(&document_type)
    }

    /// Required types not yet present, in declaration order.
    pub fn missing_required(&self) -> Vec<DocumentType> {
        REQUIRED_DOCUMENT_TYPES
            .into_iter()
            .filter(|ty| !self.documents.contains_key(ty))
            .collect()
    }

    /// Whether every required type is present, regardless of status.
    pub fn has_required(&self) -> bool {
        self.missing_required().is_empty()
    }
}

impl StepValidator for DocumentsData {
    fn validate(&self, _ctx: &ValidationContext) -> Vec<FieldError> {
        self.missing_required()
            .into_iter()
            .map(|ty| {
                FieldError::new(
                    format!("documents.{}", ty.as_str()),
                    format!("{} is required", ty.label()),
                )
            })
            .collect()
    }
}
