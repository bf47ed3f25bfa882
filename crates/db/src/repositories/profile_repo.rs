//! Repository for the `onboarding_profiles` table.

use sqlx::PgPool;
use workbridge_core::steps::ProfileData;
use workbridge_core::types::DbId;

use crate::models::profile::OnboardingProfile;

/// Column list for `onboarding_profiles` queries.
const COLUMNS: &str = "id, onboarding_id, full_name, date_of_birth, gender, phone, email, \
                       profile_photo_key, created_at, updated_at";

/// Provides operations for the single profile row of an onboarding.
pub struct ProfileRepo;

impl ProfileRepo {
    pub async fn find(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Option<OnboardingProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM onboarding_profiles WHERE onboarding_id = $1");
        sqlx::query_as::<_, OnboardingProfile>(&query)
            .bind(onboarding_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or update the profile.
    ///
    /// A payload without a photo key keeps the stored one; the key is only
    /// ever replaced through [`ProfileRepo::set_photo_key`] or a payload
    /// that names a new key.
    pub async fn upsert(
        pool: &PgPool,
        onboarding_id: DbId,
        data: &ProfileData,
    ) -> Result<OnboardingProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_profiles \
                (onboarding_id, full_name, date_of_birth, gender, phone, email, profile_photo_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT ON CONSTRAINT uq_onboarding_profiles_onboarding DO UPDATE SET \
                full_name = EXCLUDED.full_name, \
                date_of_birth = EXCLUDED.date_of_birth, \
                gender = EXCLUDED.gender, \
                phone = EXCLUDED.phone, \
                email = EXCLUDED.email, \
                profile_photo_key = COALESCE(EXCLUDED.profile_photo_key, onboarding_profiles.profile_photo_key), \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingProfile>(&query)
            .bind(onboarding_id)
            .bind(&data.full_name)
            .bind(data.date_of_birth)
            .bind(&data.gender)
            .bind(&data.phone)
            .bind(&data.email)
            .bind(&data.profile_photo_key)
            .fetch_one(pool)
            .await
    }

    /// Record the photo key, creating an otherwise empty profile row if the
    /// worker uploads a photo before saving the step.
    pub async fn set_photo_key(
        pool: &PgPool,
        onboarding_id: DbId,
        storage_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO onboarding_profiles (onboarding_id, profile_photo_key) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_onboarding_profiles_onboarding DO UPDATE SET \
                profile_photo_key = EXCLUDED.profile_photo_key, updated_at = now()",
        )
        .bind(onboarding_id)
        .bind(storage_key)
        .execute(pool)
        .await?;
        Ok(())
    }
}
