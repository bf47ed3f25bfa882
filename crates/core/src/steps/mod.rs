//! Per-step data shapes and their validators.
//!
//! Every validator is a pure function of the step data plus a
//! [`ValidationContext`]; it never mutates its input and is cheap enough to
//! run on every keystroke.

pub mod documents;
pub mod languages;
pub mod preferences;
pub mod profile;
pub mod review;
pub mod skills;
pub mod work_history;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::onboarding_wizard::{OnboardingStatus, WizardStep};
use crate::types::Date;

pub use documents::{DocumentEntry, DocumentStatus, DocumentType, DocumentsData};
pub use languages::{LanguageEntry, LanguagesData, Proficiency};
pub use preferences::PreferencesData;
pub use profile::ProfileData;
pub use review::ReviewData;
pub use skills::{CertificationEntry, SkillEntry, SkillsData};
pub use work_history::{WorkHistoryData, WorkHistoryEntry};

// ---------------------------------------------------------------------------
// Validation plumbing
// ---------------------------------------------------------------------------

/// A single failed constraint, addressed by a dotted field path
/// (e.g. `skills[0].experience_years`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Inputs a validator may depend on besides the step data itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    /// The calendar date validation is evaluated against.
    pub today: Date,
}

impl ValidationContext {
    pub fn new(today: Date) -> Self {
        Self { today }
    }

    /// Context for the current UTC date.
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().date_naive())
    }
}

/// A step whose data can be checked in isolation.
pub trait StepValidator {
    /// All constraint violations, sorted by field path. Empty means valid.
    fn validate(&self, ctx: &ValidationContext) -> Vec<FieldError>;

    fn is_valid(&self, ctx: &ValidationContext) -> bool {
        self.validate(ctx).is_empty()
    }
}

/// Flatten `validator` derive output into [`FieldError`]s under `prefix`.
pub(crate) fn collect_derive_errors(
    prefix: &str,
    result: Result<(), validator::ValidationErrors>,
    out: &mut Vec<FieldError>,
) {
    let Err(errors) = result else {
        return;
    };
    for (field, errs) in errors.field_errors() {
        for err in errs.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            out.push(FieldError::new(format!("{prefix}{field}"), message));
        }
    }
}

/// Sort errors so output is stable regardless of map iteration order.
pub(crate) fn sorted(mut errors: Vec<FieldError>) -> Vec<FieldError> {
    errors.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    errors
}

// ---------------------------------------------------------------------------
// Tagged step data
// ---------------------------------------------------------------------------

/// The data one step reports upward on completion, one variant per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "data", rename_all = "snake_case")]
pub enum StepData {
    Profile(ProfileData),
    Documents(DocumentsData),
    Skills(SkillsData),
    WorkHistory(WorkHistoryData),
    Languages(LanguagesData),
    Preferences(PreferencesData),
    Review(ReviewData),
}

impl StepData {
    /// The step this payload belongs to.
    pub fn step(&self) -> WizardStep {
        match self {
            Self::Profile(_) => WizardStep::Profile,
            Self::Documents(_) => WizardStep::Documents,
            Self::Skills(_) => WizardStep::Skills,
            Self::WorkHistory(_) => WizardStep::WorkHistory,
            Self::Languages(_) => WizardStep::Languages,
            Self::Preferences(_) => WizardStep::Preferences,
            Self::Review(_) => WizardStep::Review,
        }
    }

    /// Decode an untagged JSON payload as the data for `step`.
    pub fn parse(step: WizardStep, value: serde_json::Value) -> Result<Self, CoreError> {
        fn decode<T: serde::de::DeserializeOwned>(
            step: WizardStep,
            value: serde_json::Value,
        ) -> Result<T, CoreError> {
            serde_json::from_value(value).map_err(|e| {
                CoreError::Validation(format!("Invalid data for step '{}': {e}", step.label()))
            })
        }

        Ok(match step {
            WizardStep::Profile => Self::Profile(decode(step, value)?),
            WizardStep::Documents => Self::Documents(decode(step, value)?),
            WizardStep::Skills => Self::Skills(decode(step, value)?),
            WizardStep::WorkHistory => Self::WorkHistory(decode(step, value)?),
            WizardStep::Languages => Self::Languages(decode(step, value)?),
            WizardStep::Preferences => Self::Preferences(decode(step, value)?),
            WizardStep::Review => Self::Review(decode(step, value)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// In-memory projection of every step's data, keyed by step.
///
/// `None` means the step has never produced data (neither loaded nor
/// completed). Documents are always present as a possibly-empty map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub profile: Option<ProfileData>,
    pub documents: DocumentsData,
    pub skills: Option<SkillsData>,
    pub work_history: Option<WorkHistoryData>,
    pub languages: Option<LanguagesData>,
    pub preferences: Option<PreferencesData>,
    pub review: Option<ReviewData>,
}

impl WizardSnapshot {
    /// Replace the slot for `data.step()` with `data`.
    pub fn merge(&mut self, data: StepData) {
        match data {
            StepData::Profile(d) => self.profile = Some(d),
            StepData::Documents(d) => self.documents = d,
            StepData::Skills(d) => self.skills = Some(d),
            StepData::WorkHistory(d) => self.work_history = Some(d),
            StepData::Languages(d) => self.languages = Some(d),
            StepData::Preferences(d) => self.preferences = Some(d),
            StepData::Review(d) => self.review = Some(d),
        }
    }

    /// The stored data for `step`, if any.
    pub fn get(&self, step: WizardStep) -> Option<StepData> {
        match step {
            WizardStep::Profile => self.profile.clone().map(StepData::Profile),
            WizardStep::Documents => Some(StepData::Documents(self.documents.clone())),
            WizardStep::Skills => self.skills.clone().map(StepData::Skills),
            WizardStep::WorkHistory => self.work_history.clone().map(StepData::WorkHistory),
            WizardStep::Languages => self.languages.clone().map(StepData::Languages),
            WizardStep::Preferences => self.preferences.clone().map(StepData::Preferences),
            WizardStep::Review => self.review.clone().map(StepData::Review),
        }
    }

    /// Validate the stored data for `step`; a missing slot validates as the
    /// step's empty form.
    pub fn validate_step(&self, step: WizardStep, ctx: &ValidationContext) -> Vec<FieldError> {
        match step {
            WizardStep::Profile => self.profile.clone().unwrap_or_default().validate(ctx),
            WizardStep::Documents => self.documents.validate(ctx),
            WizardStep::Skills => self.skills.clone().unwrap_or_default().validate(ctx),
            WizardStep::WorkHistory => {
                self.work_history.clone().unwrap_or_default().validate(ctx)
            }
            WizardStep::Languages => self.languages.clone().unwrap_or_default().validate(ctx),
            WizardStep::Preferences => {
                self.preferences.clone().unwrap_or_default().validate(ctx)
            }
            WizardStep::Review => {
                review::validate_review(self, &self.review.clone().unwrap_or_default())
            }
        }
    }

    /// Validate `data` as it would stand once merged into this snapshot.
    pub fn validate_candidate(&self, data: &StepData, ctx: &ValidationContext) -> Vec<FieldError> {
        match data {
            StepData::Profile(d) => d.validate(ctx),
            StepData::Documents(d) => d.validate(ctx),
            StepData::Skills(d) => d.validate(ctx),
            StepData::WorkHistory(d) => d.validate(ctx),
            StepData::Languages(d) => d.validate(ctx),
            StepData::Preferences(d) => d.validate(ctx),
            StepData::Review(d) => review::validate_review(self, d),
        }
    }

    /// Derive the set of completed steps from the data alone.
    ///
    /// Presence implies completion: a step counts as done once the data it
    /// owns exists in a usable shape. Review is only complete once the record
    /// has left `draft`.
    pub fn derive_completed_steps(&self, status: OnboardingStatus) -> BTreeSet<WizardStep> {
        WizardStep::ALL
            .into_iter()
            .filter(|step| match step {
                WizardStep::Profile => self
                    .profile
                    .as_ref()
                    .is_some_and(|p| !p.full_name.trim().is_empty()),
                WizardStep::Documents => self.documents.has_required(),
                WizardStep::Skills => self.skills.as_ref().is_some_and(|s| !s.skills.is_empty()),
                WizardStep::WorkHistory => self.work_history.is_some(),
                WizardStep::Languages => self
                    .languages
                    .as_ref()
                    .is_some_and(|l| !l.languages.is_empty()),
                WizardStep::Preferences => self
                    .preferences
                    .as_ref()
                    .is_some_and(|p| !p.preferred_countries.is_empty()),
                WizardStep::Review => status != OnboardingStatus::Draft,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
