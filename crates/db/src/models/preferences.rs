//! Job preferences row.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::steps::PreferencesData;
use workbridge_core::types::{Date, DbId, Timestamp};

/// A row from the `onboarding_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingPreferences {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub preferred_countries: Vec<String>,
    pub expected_wage_currency: String,
    pub expected_wage_amount: f64,
    pub contract_length: Option<String>,
    pub availability_date: Option<Date>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<OnboardingPreferences> for PreferencesData {
    fn from(row: OnboardingPreferences) -> Self {
        Self {
            preferred_countries: row.preferred_countries,
            expected_wage_currency: row.expected_wage_currency,
            expected_wage_amount: row.expected_wage_amount,
            contract_length: row.contract_length,
            availability_date: row.availability_date,
        }
    }
}
