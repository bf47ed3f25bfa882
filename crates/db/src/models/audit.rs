//! Audit event rows. Append-only, so there is no `updated_at`.

use serde::Serialize;
use sqlx::FromRow;
use workbridge_core::types::{DbId, Timestamp};

/// A row from the `audit_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEvent {
    pub id: DbId,
    pub actor_id: DbId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for inserting an audit event.
#[derive(Debug, Clone)]
pub struct CreateAuditEvent {
    pub actor_id: DbId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub metadata: serde_json::Value,
}
