//! Repository for the append-only `audit_events` table.

use sqlx::PgPool;
use workbridge_core::types::DbId;

use crate::models::audit::{AuditEvent, CreateAuditEvent};

const COLUMNS: &str = "id, actor_id, action, entity_type, entity_id, metadata, created_at";

/// Provides insert and lookup for audit events.
pub struct AuditEventRepo;

impl AuditEventRepo {
    /// Insert inside an open transaction so the event commits with the
    /// change it describes.
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: &CreateAuditEvent,
    ) -> Result<AuditEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_events (actor_id, action, entity_type, entity_id, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditEvent>(&query)
            .bind(event.actor_id)
            .bind(&event.action)
            .bind(&event.entity_type)
            .bind(event.entity_id)
            .bind(&event.metadata)
            .fetch_one(&mut **tx)
            .await
    }

    /// Events for one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_events \
             WHERE entity_type = $1 AND entity_id = $2 ORDER BY id"
        );
        sqlx::query_as::<_, AuditEvent>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
