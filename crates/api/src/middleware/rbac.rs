//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use workbridge_core::error::CoreError;
use workbridge_core::roles::ROLE_WORKER;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `worker` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn onboarding_only(RequireWorker(user): RequireWorker) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireWorker(pub AuthUser);

impl FromRequestParts<AppState> for RequireWorker {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_WORKER {
            return Err(AppError::Core(CoreError::Forbidden(
                "Worker role required".into(),
            )));
        }
        Ok(RequireWorker(user))
    }
}
