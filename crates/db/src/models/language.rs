//! Language row.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::error::CoreError;
use workbridge_core::steps::{LanguageEntry, Proficiency};
use workbridge_core::types::{DbId, Timestamp};

/// A row from the `onboarding_languages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingLanguage {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub language_name: String,
    pub proficiency: Option<String>,
    pub created_at: Timestamp,
}

impl OnboardingLanguage {
    pub fn into_entry(self) -> Result<LanguageEntry, CoreError> {
        Ok(LanguageEntry {
            language_name: self.language_name,
            proficiency: self
                .proficiency
                .as_deref()
                .map(Proficiency::from_str_db)
                .transpose()?,
        })
    }
}
