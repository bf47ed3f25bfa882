use workbridge_core::gateway::GatewayError;
use workbridge_core::onboarding_wizard::{OnboardingStatus, WizardStep};
use workbridge_core::steps::{DocumentType, FieldError};
use workbridge_core::storage::StorageError;
use workbridge_core::uploads::UploadRejection;

/// Failures surfaced by the wizard controller.
///
/// Only `AuthRequired` ends the flow; every other variant is recoverable by
/// further user interaction.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Step '{step}' has {} invalid field(s)", .errors.len())]
    ValidationFailed {
        step: WizardStep,
        errors: Vec<FieldError>,
    },

    #[error("Upload rejected: {0}")]
    UploadRejected(#[from] UploadRejection),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Best-effort object removal failed. Logged, never returned to callers.
    #[error("Storage cleanup failed: {0}")]
    StorageCleanupFailed(String),

    #[error("Cannot navigate from '{from}' to '{to}'")]
    NavigationBlocked { from: WizardStep, to: WizardStep },

    #[error("Data for step '{actual}' was sent to step '{expected}'")]
    StepMismatch {
        expected: WizardStep,
        actual: WizardStep,
    },

    #[error("Onboarding is '{}' and can no longer be edited", .status.as_str())]
    ReadOnly { status: OnboardingStatus },

    #[error("Wizard is not ready: {0}")]
    NotReady(&'static str),

    #[error("No {} document has been uploaded", .0.label())]
    DocumentNotFound(DocumentType),
}

impl From<GatewayError> for WizardError {
    fn from(err: GatewayError) -> Self {
        Self::PersistenceFailed(err.to_string())
    }
}

impl From<StorageError> for WizardError {
    fn from(err: StorageError) -> Self {
        Self::PersistenceFailed(err.to_string())
    }
}
