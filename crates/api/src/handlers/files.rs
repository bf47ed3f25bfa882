//! Signed download of stored objects.
//!
//! Objects are never served by key alone: the URL must carry an unexpired
//! `expires` timestamp and an HMAC `sig` issued by the storage backend.

use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use serde::Deserialize;

use workbridge_core::error::CoreError;
use workbridge_core::storage::StorageError;
use workbridge_core::uploads::{file_extension, mime_for_extension};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedParams {
    pub expires: i64,
    pub sig: String,
}

/// GET /files/{*key}?expires=&sig=
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<SignedParams>,
) -> AppResult<impl IntoResponse> {
    if !state.signer.verify(&key, params.expires, &params.sig) {
        tracing::warn!(key = %key, "Rejected file request with bad or expired signature");
        return Err(AppError::Core(CoreError::Forbidden(
            "Invalid or expired file link".into(),
        )));
    }

    let bytes = state.storage.get(&key).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidKey(_) => {
            AppError::Core(CoreError::NotFound {
                entity: "StoredObject",
                id: 0,
            })
        }
        other => AppError::InternalError(other.to_string()),
    })?;

    let content_type = mime_for_extension(&file_extension(&key));
    Ok((
        [(CONTENT_TYPE, content_type), (CACHE_CONTROL, "private, no-store")],
        bytes,
    ))
}
