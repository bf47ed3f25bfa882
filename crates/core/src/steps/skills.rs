//! Skills step: skill list plus optional certifications.

use serde::{Deserialize, Serialize};

use super::{collect_derive_errors, sorted, FieldError, StepValidator, ValidationContext};
use crate::types::Date;

/// Upper bound on claimed experience for a single skill.
pub const MAX_EXPERIENCE_YEARS: i32 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, validator::Validate)]
pub struct SkillEntry {
    pub skill_name: String,
    #[validate(range(min = 0, max = 60, message = "Experience must be between 0 and 60 years"))]
    pub experience_years: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub issue_date: Option<Date>,
    /// Storage key of a scanned certificate, if one was attached.
    #[serde(default)]
    pub file_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsData {
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    #[serde(default)]
    pub certifications: Vec<CertificationEntry>,
}

impl StepValidator for SkillsData {
    fn validate(&self, _ctx: &ValidationContext) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.skills.is_empty() {
            errors.push(FieldError::new("skills", "Add at least one skill"));
        }

        for (i, skill) in self.skills.iter().enumerate() {
            let prefix = format!("skills[{i}].");
            if skill.skill_name.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("{prefix}skill_name"),
                    "Skill name is required",
                ));
            }
            collect_derive_errors(&prefix, validator::Validate::validate(skill), &mut errors);
        }

        for (i, cert) in self.certifications.iter().enumerate() {
            if cert.name.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("certifications[{i}].name"),
                    "Certification name is required",
                ));
            }
        }

        sorted(errors)
    }
}
