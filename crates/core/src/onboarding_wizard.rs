//! Worker onboarding wizard: step definitions, record status, and the
//! navigation rule.
//!
//! Steps are addressed through [`WizardStep`] everywhere; the 1-based
//! numbers only exist at the persistence and HTTP boundaries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Onboarding status
// ---------------------------------------------------------------------------

/// Status values for a worker onboarding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Draft,
    PendingVerification,
    Approved,
    Rejected,
}

impl OnboardingStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_verification" => Ok(Self::PendingVerification),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid onboarding status '{s}'. Must be one of: draft, \
                 pending_verification, approved, rejected"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingVerification => "pending_verification",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the worker may still change step data.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }
}

// ---------------------------------------------------------------------------
// Wizard steps
// ---------------------------------------------------------------------------

/// The seven steps of the worker onboarding wizard, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Profile,
    Documents,
    Skills,
    WorkHistory,
    Languages,
    Preferences,
    Review,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 7;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 7;

impl WizardStep {
    /// Every step in display order.
    pub const ALL: [WizardStep; TOTAL_STEPS as usize] = [
        Self::Profile,
        Self::Documents,
        Self::Skills,
        Self::WorkHistory,
        Self::Languages,
        Self::Preferences,
        Self::Review,
    ];

    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::Profile),
            2 => Ok(Self::Documents),
            3 => Ok(Self::Skills),
            4 => Ok(Self::WorkHistory),
            5 => Ok(Self::Languages),
            6 => Ok(Self::Preferences),
            7 => Ok(Self::Review),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn number(self) -> u8 {
        match self {
            Self::Profile => 1,
            Self::Documents => 2,
            Self::Skills => 3,
            Self::WorkHistory => 4,
            Self::Languages => 5,
            Self::Preferences => 6,
            Self::Review => 7,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::Profile => "Profile",
            Self::Documents => "Documents",
            Self::Skills => "Skills",
            Self::WorkHistory => "Work History",
            Self::Languages => "Languages",
            Self::Preferences => "Preferences",
            Self::Review => "Review",
        }
    }

    /// Key under which the step's data lives in the client snapshot.
    pub fn snapshot_key(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Documents => "documents",
            Self::Skills => "skills",
            Self::WorkHistory => "workHistory",
            Self::Languages => "languages",
            Self::Preferences => "preferences",
            Self::Review => "review",
        }
    }

    /// The following step, if any.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1).ok()
    }

    /// The preceding step, if any.
    pub fn prev(self) -> Option<Self> {
        Self::from_number(self.number().checked_sub(1)?).ok()
    }

    /// Whether completing this step stages data for a debounced save.
    ///
    /// Documents persist on upload and Review persists through submission,
    /// so neither goes through autosave.
    pub fn autosaves(self) -> bool {
        !matches!(self, Self::Documents | Self::Review)
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Decide whether the wizard may move from `current` to `target`.
///
/// Backward moves and moves to completed steps are always allowed. The only
/// forward move into unvisited territory is the immediate next step, and
/// only while the current step is marked valid.
pub fn can_navigate_to(
    target: WizardStep,
    current: WizardStep,
    completed: &BTreeSet<WizardStep>,
    current_valid: bool,
) -> bool {
    target <= current
        || completed.contains(&target)
        || (Some(target) == current.next() && current_valid)
}

/// Share of steps completed, rounded to a whole percentage.
pub fn completion_percent(completed: &BTreeSet<WizardStep>) -> u8 {
    let done = completed.len().min(TOTAL_STEPS as usize) as f64;
    (done * 100.0 / TOTAL_STEPS as f64).round() as u8
}

/// Validate that a persisted step number is within the valid range.
pub fn validate_step_number(step: i32) -> Result<WizardStep, CoreError> {
    u8::try_from(step)
        .map_err(|_| CoreError::Validation(format!("Step {step} is out of range")))
        .and_then(WizardStep::from_number)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
