//! Repository for the `onboarding_preferences` table.

use sqlx::PgPool;
use workbridge_core::steps::PreferencesData;
use workbridge_core::types::DbId;

use crate::models::preferences::OnboardingPreferences;

const COLUMNS: &str = "id, onboarding_id, preferred_countries, expected_wage_currency, \
                       expected_wage_amount, contract_length, availability_date, \
                       created_at, updated_at";

/// Provides operations for the single preferences row of an onboarding.
pub struct PreferencesRepo;

impl PreferencesRepo {
    pub async fn find(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Option<OnboardingPreferences>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM onboarding_preferences WHERE onboarding_id = $1");
        sqlx::query_as::<_, OnboardingPreferences>(&query)
            .bind(onboarding_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn upsert(
        pool: &PgPool,
        onboarding_id: DbId,
        data: &PreferencesData,
    ) -> Result<OnboardingPreferences, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_preferences \
                (onboarding_id, preferred_countries, expected_wage_currency, \
                 expected_wage_amount, contract_length, availability_date) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT uq_onboarding_preferences_onboarding DO UPDATE SET \
                preferred_countries = EXCLUDED.preferred_countries, \
                expected_wage_currency = EXCLUDED.expected_wage_currency, \
                expected_wage_amount = EXCLUDED.expected_wage_amount, \
                contract_length = EXCLUDED.contract_length, \
                availability_date = EXCLUDED.availability_date, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingPreferences>(&query)
            .bind(onboarding_id)
            .bind(&data.preferred_countries)
            .bind(&data.expected_wage_currency)
            .bind(data.expected_wage_amount)
            .bind(&data.contract_length)
            .bind(data.availability_date)
            .fetch_one(pool)
            .await
    }
}
