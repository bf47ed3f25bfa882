//! Repository for `onboarding_skills` and `onboarding_certifications`.

use sqlx::PgPool;
use workbridge_core::steps::SkillsData;
use workbridge_core::types::{Date, DbId};

use crate::models::skill::{OnboardingCertification, OnboardingSkill};

const SKILL_COLUMNS: &str = "id, onboarding_id, skill_name, experience_years, created_at";

const CERTIFICATION_COLUMNS: &str =
    "id, onboarding_id, name, issuer, issue_date, file_key, created_at";

/// Provides operations for the skills step.
pub struct SkillRepo;

impl SkillRepo {
    pub async fn list_skills(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Vec<OnboardingSkill>, sqlx::Error> {
        let query = format!(
            "SELECT {SKILL_COLUMNS} FROM onboarding_skills WHERE onboarding_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, OnboardingSkill>(&query)
            .bind(onboarding_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_certifications(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Vec<OnboardingCertification>, sqlx::Error> {
        let query = format!(
            "SELECT {CERTIFICATION_COLUMNS} FROM onboarding_certifications \
             WHERE onboarding_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, OnboardingCertification>(&query)
            .bind(onboarding_id)
            .fetch_all(pool)
            .await
    }

    /// Replace every skill and certification for the onboarding.
    ///
    /// Delete and insert share one transaction, so readers see either the
    /// old set or the new one.
    pub async fn replace_all(
        pool: &PgPool,
        onboarding_id: DbId,
        data: &SkillsData,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        Self::replace_skills_inner(&mut tx, onboarding_id, data).await?;
        Self::replace_certifications_inner(&mut tx, onboarding_id, data).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_skills_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        onboarding_id: DbId,
        data: &SkillsData,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM onboarding_skills WHERE onboarding_id = $1")
            .bind(onboarding_id)
            .execute(&mut **tx)
            .await?;

        if data.skills.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = data.skills.iter().map(|s| s.skill_name.as_str()).collect();
        let years: Vec<i32> = data.skills.iter().map(|s| s.experience_years).collect();

        sqlx::query(
            "INSERT INTO onboarding_skills (onboarding_id, skill_name, experience_years) \
             SELECT $1, * FROM UNNEST($2::TEXT[], $3::INT[])",
        )
        .bind(onboarding_id)
        .bind(&names)
        .bind(&years)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn replace_certifications_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        onboarding_id: DbId,
        data: &SkillsData,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM onboarding_certifications WHERE onboarding_id = $1")
            .bind(onboarding_id)
            .execute(&mut **tx)
            .await?;

        if data.certifications.is_empty() {
            return Ok(());
        }

        let certs = &data.certifications;
        let names: Vec<&str> = certs.iter().map(|c| c.name.as_str()).collect();
        let issuers: Vec<&str> = certs.iter().map(|c| c.issuer.as_str()).collect();
        let dates: Vec<Option<Date>> = certs.iter().map(|c| c.issue_date).collect();
        let keys: Vec<Option<String>> = certs.iter().map(|c| c.file_key.clone()).collect();

        sqlx::query(
            "INSERT INTO onboarding_certifications \
                (onboarding_id, name, issuer, issue_date, file_key) \
             SELECT $1, * FROM UNNEST($2::TEXT[], $3::TEXT[], $4::DATE[], $5::TEXT[])",
        )
        .bind(onboarding_id)
        .bind(&names)
        .bind(&issuers)
        .bind(&dates)
        .bind(&keys)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
