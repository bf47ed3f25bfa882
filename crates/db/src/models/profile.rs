//! Profile step row.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::steps::ProfileData;
use workbridge_core::types::{Date, DbId, Timestamp};

/// A row from the `onboarding_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingProfile {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub full_name: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: String,
    pub email: String,
    pub profile_photo_key: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<OnboardingProfile> for ProfileData {
    fn from(row: OnboardingProfile) -> Self {
        Self {
            full_name: row.full_name,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            phone: row.phone,
            email: row.email,
            profile_photo_key: row.profile_photo_key,
        }
    }
}
