//! Handlers for the worker onboarding wizard.
//!
//! Every handler resolves the caller's live [`WizardController`] through
//! [`WizardSessions`](crate::sessions::WizardSessions) and returns the
//! refreshed wizard view, so the client re-renders from one shape.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use workbridge_core::error::CoreError;
use workbridge_core::onboarding_wizard::{validate_step_number, WizardStep};
use workbridge_core::steps::{DocumentType, StepData};
use workbridge_wizard::autosave::SaveFailure;
use workbridge_wizard::{WizardController, WizardView};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireWorker;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// The wizard view plus any background save failures since the last response.
#[derive(Debug, Serialize)]
pub struct WizardResponse {
    #[serde(flatten)]
    pub view: WizardView,
    pub save_failures: Vec<SaveFailure>,
}

#[derive(Debug, Deserialize)]
pub struct ValidityBody {
    pub is_valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct NavigateBody {
    pub step: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(default)]
    pub terms_accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct ReachableResponse {
    pub step: WizardStep,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub profile_photo_key: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn respond(wizard: &WizardController) -> Json<DataResponse<WizardResponse>> {
    Json(DataResponse {
        data: WizardResponse {
            view: wizard.view(),
            save_failures: wizard.drain_save_failures(),
        },
    })
}

fn parse_document_type(raw: &str) -> AppResult<DocumentType> {
    Ok(DocumentType::from_str_db(raw)?)
}

/// Pull the `file` field out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(AppError::BadRequest("Missing multipart field 'file'".into()))
}

// ---------------------------------------------------------------------------
// POST /onboarding  |  GET /onboarding
// ---------------------------------------------------------------------------

/// Load (or create) the caller's onboarding record and start a fresh session.
pub async fn initialize(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
) -> AppResult<impl IntoResponse> {
    let shared = state.sessions.open(auth.user_id).await?;
    let wizard = shared.lock().await;
    Ok(respond(&wizard))
}

pub async fn get_wizard(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
) -> AppResult<impl IntoResponse> {
    let wizard = state.sessions.lock(auth.user_id).await?;
    Ok(respond(&wizard))
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Submit a step's data. The body is the step's own data object.
pub async fn complete_step(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Path(step): Path<i32>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let step = validate_step_number(step)?;
    let data = StepData::parse(step, body)?;

    let mut wizard = state.sessions.lock(auth.user_id).await?;
    wizard.complete_step(step, data)?;
    Ok(respond(&wizard))
}

/// Record the live validity reported by a step form.
pub async fn set_validity(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Path(step): Path<i32>,
    Json(body): Json<ValidityBody>,
) -> AppResult<impl IntoResponse> {
    let step = validate_step_number(step)?;
    let mut wizard = state.sessions.lock(auth.user_id).await?;
    wizard.set_step_validity(step, body.is_valid);
    Ok(respond(&wizard))
}

pub async fn reachable(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Path(step): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let step = validate_step_number(step)?;
    let wizard = state.sessions.lock(auth.user_id).await?;
    Ok(Json(DataResponse {
        data: ReachableResponse {
            step,
            reachable: wizard.can_navigate_to(step),
        },
    }))
}

pub async fn navigate(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Json(body): Json<NavigateBody>,
) -> AppResult<impl IntoResponse> {
    let target = validate_step_number(body.step)?;
    let mut wizard = state.sessions.lock(auth.user_id).await?;
    wizard.navigate_to(target)?;
    Ok(respond(&wizard))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub async fn upload_document(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Path(document_type): Path<String>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let document_type = parse_document_type(&document_type)?;
    let (file_name, bytes) = read_file_field(multipart).await?;

    let mut wizard = state.sessions.lock(auth.user_id).await?;
    let entry = wizard
        .upload_document(document_type, &file_name, &bytes)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

pub async fn remove_document(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Path(document_type): Path<String>,
) -> AppResult<impl IntoResponse> {
    let document_type = parse_document_type(&document_type)?;
    let mut wizard = state.sessions.lock(auth.user_id).await?;

    if !wizard.remove_document(document_type).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "OnboardingDocument",
            id: wizard.onboarding_id(),
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// A short-lived signed URL for displaying an uploaded document.
pub async fn document_url(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Path(document_type): Path<String>,
) -> AppResult<impl IntoResponse> {
    let document_type = parse_document_type(&document_type)?;
    let wizard = state.sessions.lock(auth.user_id).await?;
    let url = wizard.document_url(document_type).await?;
    Ok(Json(DataResponse { data: url }))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let (file_name, bytes) = read_file_field(multipart).await?;
    let mut wizard = state.sessions.lock(auth.user_id).await?;
    let key = wizard.upload_profile_photo(&file_name, &bytes).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: PhotoResponse {
                profile_photo_key: key,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /onboarding/submit
// ---------------------------------------------------------------------------

/// Flush pending saves and submit the onboarding for verification.
pub async fn submit(
    State(state): State<AppState>,
    RequireWorker(auth): RequireWorker,
    Json(body): Json<SubmitBody>,
) -> AppResult<impl IntoResponse> {
    let mut wizard = state.sessions.lock(auth.user_id).await?;
    wizard.submit(body.terms_accepted).await?;
    Ok(respond(&wizard))
}
