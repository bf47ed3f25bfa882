//! Skills step rows: skills and certifications.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::steps::{CertificationEntry, SkillEntry};
use workbridge_core::types::{Date, DbId, Timestamp};

/// A row from the `onboarding_skills` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingSkill {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub skill_name: String,
    pub experience_years: i32,
    pub created_at: Timestamp,
}

impl From<OnboardingSkill> for SkillEntry {
    fn from(row: OnboardingSkill) -> Self {
        Self {
            skill_name: row.skill_name,
            experience_years: row.experience_years,
        }
    }
}

/// A row from the `onboarding_certifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingCertification {
    pub id: DbId,
    pub onboarding_id: DbId,
    pub name: String,
    pub issuer: String,
    pub issue_date: Option<Date>,
    pub file_key: Option<String>,
    pub created_at: Timestamp,
}

impl From<OnboardingCertification> for CertificationEntry {
    fn from(row: OnboardingCertification) -> Self {
        Self {
            name: row.name,
            issuer: row.issuer,
            issue_date: row.issue_date,
            file_key: row.file_key,
        }
    }
}
