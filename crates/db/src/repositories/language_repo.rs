//! Repository for the `onboarding_languages` table.

use sqlx::PgPool;
use workbridge_core::steps::LanguagesData;
use workbridge_core::types::DbId;

use crate::models::language::OnboardingLanguage;

const COLUMNS: &str = "id, onboarding_id, language_name, proficiency, created_at";

/// Provides operations for the languages step.
pub struct LanguageRepo;

impl LanguageRepo {
    pub async fn list(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Vec<OnboardingLanguage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_languages WHERE onboarding_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, OnboardingLanguage>(&query)
            .bind(onboarding_id)
            .fetch_all(pool)
            .await
    }

    /// Replace all languages in a single transaction.
    pub async fn replace_all(
        pool: &PgPool,
        onboarding_id: DbId,
        data: &LanguagesData,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM onboarding_languages WHERE onboarding_id = $1")
            .bind(onboarding_id)
            .execute(&mut *tx)
            .await?;

        if !data.languages.is_empty() {
            let names: Vec<&str> = data
                .languages
                .iter()
                .map(|l| l.language_name.as_str())
                .collect();
            let levels: Vec<Option<&str>> = data
                .languages
                .iter()
                .map(|l| l.proficiency.as_ref().map(|p| p.as_str()))
                .collect();

            sqlx::query(
                "INSERT INTO onboarding_languages (onboarding_id, language_name, proficiency) \
                 SELECT $1, * FROM UNNEST($2::TEXT[], $3::TEXT[])",
            )
            .bind(onboarding_id)
            .bind(&names)
            .bind(&levels)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
