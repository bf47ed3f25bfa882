//! Worker onboarding root row.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::error::CoreError;
use workbridge_core::gateway::OnboardingRecord;
use workbridge_core::onboarding_wizard::{validate_step_number, OnboardingStatus};
use workbridge_core::types::{DbId, Timestamp};

/// A row from the `worker_onboardings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkerOnboarding {
    pub id: DbId,
    pub user_id: DbId,
    pub current_step: i32,
    pub status: String,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkerOnboarding {
    pub fn into_record(self) -> Result<OnboardingRecord, CoreError> {
        Ok(OnboardingRecord {
            id: self.id,
            user_id: self.user_id,
            current_step: validate_step_number(self.current_step)?,
            status: OnboardingStatus::from_str_db(&self.status)?,
            submitted_at: self.submitted_at,
        })
    }
}
