//! Work history row.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::steps::WorkHistoryEntry;
use workbridge_core::types::{Date, DbId, Timestamp};

/// A row from the `onboarding_work_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingWorkHistory {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub company_name: String,
    pub role: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub is_current: bool,
    pub responsibilities: Option<String>,
    pub created_at: Timestamp,
}

impl From<OnboardingWorkHistory> for WorkHistoryEntry {
    fn from(row: OnboardingWorkHistory) -> Self {
        Self {
            company_name: row.company_name,
            role: row.role,
            start_date: row.start_date,
            end_date: row.end_date,
            is_current: row.is_current,
            responsibilities: row.responsibilities,
        }
    }
}
