use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use workbridge_core::error::CoreError;
use workbridge_wizard::WizardError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`WizardError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies,
/// with extra fields where the client needs them (`errors` on validation
/// failures, `reason` on rejected uploads).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String, Option<(&'static str, Value)>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, extra) = match &self {
            AppError::Core(core) => {
                let (status, code, message) = classify_core_error(core);
                (status, code, message, None)
            }
            AppError::Wizard(err) => classify_wizard_error(err),
            AppError::Database(err) => {
                let (status, code, message) = classify_sqlx_error(err);
                (status, code, message, None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some((field, value)) = extra {
            body[field] = value;
        }

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

fn classify_wizard_error(err: &WizardError) -> Classified {
    let message = err.to_string();
    match err {
        WizardError::AuthRequired => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message, None),
        WizardError::ValidationFailed { errors, .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_FAILED",
            message,
            Some(("errors", json!(errors))),
        ),
        WizardError::UploadRejected(rejection) => (
            StatusCode::BAD_REQUEST,
            "UPLOAD_REJECTED",
            message,
            Some(("reason", json!(rejection))),
        ),
        WizardError::NavigationBlocked { .. } => {
            (StatusCode::CONFLICT, "NAVIGATION_BLOCKED", message, None)
        }
        WizardError::ReadOnly { .. } => (StatusCode::CONFLICT, "READ_ONLY", message, None),
        WizardError::NotReady(_) => (StatusCode::CONFLICT, "NOT_READY", message, None),
        WizardError::StepMismatch { .. } => {
            (StatusCode::BAD_REQUEST, "STEP_MISMATCH", message, None)
        }
        WizardError::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
        WizardError::PersistenceFailed(detail) | WizardError::StorageCleanupFailed(detail) => {
            tracing::error!(error = %detail, "Persistence failed");
            (
                StatusCode::BAD_GATEWAY,
                "PERSISTENCE_FAILED",
                "Saving failed, please retry".to_string(),
                None,
            )
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations on `uq_*` constraints map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
