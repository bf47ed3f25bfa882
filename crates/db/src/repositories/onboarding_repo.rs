//! Repository for the `worker_onboardings` table.

use sqlx::PgPool;
use workbridge_core::onboarding_wizard::WizardStep;
use workbridge_core::types::DbId;

use crate::models::onboarding::WorkerOnboarding;

/// Column list for `worker_onboardings` queries.
const COLUMNS: &str = "id, user_id, current_step, status, submitted_at, created_at, updated_at";

/// Provides operations for the onboarding root record.
pub struct OnboardingRepo;

impl OnboardingRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WorkerOnboarding>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM worker_onboardings WHERE id = $1");
        sqlx::query_as::<_, WorkerOnboarding>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<WorkerOnboarding>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM worker_onboardings WHERE user_id = $1");
        sqlx::query_as::<_, WorkerOnboarding>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Return the user's record, inserting a `draft` at step 1 if none exists.
    ///
    /// The no-op `DO UPDATE` makes `RETURNING` yield the existing row when two
    /// first visits race on the unique `user_id`.
    pub async fn get_or_create(pool: &PgPool, user_id: DbId) -> Result<WorkerOnboarding, sqlx::Error> {
        let query = format!(
            "INSERT INTO worker_onboardings (user_id) VALUES ($1) \
             ON CONFLICT ON CONSTRAINT uq_worker_onboardings_user \
             DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerOnboarding>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Move the step pointer. Returns `false` if the record does not exist.
    pub async fn update_current_step(
        pool: &PgPool,
        id: DbId,
        step: WizardStep,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE worker_onboardings SET current_step = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(i32::from(step.number()))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip a `draft` to `pending_verification` inside `tx`.
    ///
    /// Returns `None` when the record is missing or no longer a draft; the
    /// status filter makes a double submit a no-op.
    pub async fn mark_submitted(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<WorkerOnboarding>, sqlx::Error> {
        let query = format!(
            "UPDATE worker_onboardings \
             SET status = 'pending_verification', submitted_at = now(), updated_at = now() \
             WHERE id = $1 AND status = 'draft' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerOnboarding>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }
}
