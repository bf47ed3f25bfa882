//! Repository for the `onboarding_documents` table.

use sqlx::PgPool;
use workbridge_core::gateway::NewDocument;
use workbridge_core::steps::DocumentType;
use workbridge_core::types::DbId;

use crate::models::document::OnboardingDocument;

/// Column list for `onboarding_documents` queries.
const COLUMNS: &str = "id, onboarding_id, document_type, file_name, file_size, mime_type, \
                       storage_key, status, created_at, updated_at";

/// Provides operations for KYC documents. One row per `(onboarding, type)`.
pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn list_for_onboarding(
        pool: &PgPool,
        onboarding_id: DbId,
    ) -> Result<Vec<OnboardingDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_documents \
             WHERE onboarding_id = $1 ORDER BY document_type"
        );
        sqlx::query_as::<_, OnboardingDocument>(&query)
            .bind(onboarding_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<Option<OnboardingDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_documents \
             WHERE onboarding_id = $1 AND document_type = $2"
        );
        sqlx::query_as::<_, OnboardingDocument>(&query)
            .bind(onboarding_id)
            .bind(document_type.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Insert the document or replace the existing one of the same type.
    ///
    /// A replacement resets the verification status to `uploaded`.
    pub async fn upsert(
        pool: &PgPool,
        onboarding_id: DbId,
        doc: &NewDocument,
    ) -> Result<OnboardingDocument, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_documents \
                (onboarding_id, document_type, file_name, file_size, mime_type, storage_key) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT uq_onboarding_documents_type DO UPDATE SET \
                file_name = EXCLUDED.file_name, \
                file_size = EXCLUDED.file_size, \
                mime_type = EXCLUDED.mime_type, \
                storage_key = EXCLUDED.storage_key, \
                status = 'uploaded', \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingDocument>(&query)
            .bind(onboarding_id)
            .bind(doc.document_type.as_str())
            .bind(&doc.file_name)
            .bind(doc.file_size)
            .bind(&doc.mime_type)
            .bind(&doc.storage_key)
            .fetch_one(pool)
            .await
    }

    /// Delete the document of `document_type`. Returns whether a row existed.
    pub async fn delete(
        pool: &PgPool,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM onboarding_documents WHERE onboarding_id = $1 AND document_type = $2",
        )
        .bind(onboarding_id)
        .bind(document_type.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
