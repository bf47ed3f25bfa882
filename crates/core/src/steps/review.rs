//! Review step: the final check before the irreversible submission.

use serde::{Deserialize, Serialize};

use super::{FieldError, WizardSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewData {
    #[serde(default)]
    pub terms_accepted: bool,
}

/// Check whether `snapshot` may be submitted with `review`.
///
/// Requires accepted terms, every required document, a profile, and at least
/// one skill. Other steps are not re-checked here.
pub fn validate_review(snapshot: &WizardSnapshot, review: &ReviewData) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !review.terms_accepted {
        errors.push(FieldError::new(
            "terms_accepted",
            "Accept the terms and conditions to submit",
        ));
    }
    for ty in snapshot.documents.missing_required() {
        errors.push(FieldError::new(
            format!("documents.{}", ty.as_str()),
            format!("{} is required", ty.label()),
        ));
    }
    if snapshot
        .profile
        .as_ref()
        .map_or(true, |p| p.full_name.trim().is_empty())
    {
        errors.push(FieldError::new("profile", "Complete your profile"));
    }
    if snapshot.skills.as_ref().map_or(true, |s| s.skills.is_empty()) {
        errors.push(FieldError::new("skills", "Add at least one skill"));
    }
    errors
}
