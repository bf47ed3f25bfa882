//! Audit trail vocabulary for onboarding events.

/// Known action types for audit events.
pub mod action_types {
    pub const ONBOARDING_SUBMITTED: &str = "onboarding_submitted";
}

/// Known entity types referenced by audit events.
pub mod entity_types {
    pub const WORKER_ONBOARDING: &str = "worker_onboarding";
}

/// Build the metadata payload recorded with an `onboarding_submitted` event.
pub fn submission_metadata(submitted_at: crate::types::Timestamp) -> serde_json::Value {
    serde_json::json!({ "submitted_at": submitted_at.to_rfc3339() })
}
