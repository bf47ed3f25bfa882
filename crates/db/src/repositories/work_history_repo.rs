//! Repository for the `onboarding_work_history` table.

use sqlx::PgPool;
use workbridge_core::steps::WorkHistoryData;
use workbridge_core::types::{Date, DbId};

use crate::models::work_history::OnboardingWorkHistory;

const COLUMNS: &str = "id, onboarding_id, company_name, role, start_date, end_date, \
                       is_current, responsibilities, created_at";

/// Provides operations for the work history step.
pub struct WorkHistoryRepo;

impl WorkHistoryRepo {
    pub async fn list(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Vec<OnboardingWorkHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_work_history WHERE onboarding_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, OnboardingWorkHistory>(&query)
            .bind(onboarding_id)
            .fetch_all(pool)
            .await
    }

    /// Replace all entries in a single transaction.
    pub async fn replace_all(
        pool: &PgPool,
        onboarding_id: DbId,
        data: &WorkHistoryData,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM onboarding_work_history WHERE onboarding_id = $1")
            .bind(onboarding_id)
            .execute(&mut *tx)
            .await?;

        if !data.entries.is_empty() {
            let entries = &data.entries;
            let companies: Vec<&str> = entries.iter().map(|e| e.company_name.as_str()).collect();
            let roles: Vec<&str> = entries.iter().map(|e| e.role.as_str()).collect();
            let starts: Vec<Option<Date>> = entries.iter().map(|e| e.start_date).collect();
            let ends: Vec<Option<Date>> = entries.iter().map(|e| e.end_date).collect();
            let current: Vec<bool> = entries.iter().map(|e| e.is_current).collect();
            let notes: Vec<Option<String>> =
                entries.iter().map(|e| e.responsibilities.clone()).collect();

            sqlx::query(
                "INSERT INTO onboarding_work_history \
                    (onboarding_id, company_name, role, start_date, end_date, is_current, responsibilities) \
                 SELECT $1, * FROM UNNEST($2::TEXT[], $3::TEXT[], $4::DATE[], $5::DATE[], $6::BOOL[], $7::TEXT[])",
            )
            .bind(onboarding_id)
            .bind(&companies)
            .bind(&roles)
            .bind(&starts)
            .bind(&ends)
            .bind(&current)
            .bind(&notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
