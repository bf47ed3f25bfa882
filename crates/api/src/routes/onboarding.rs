//! Route definitions for the worker onboarding wizard.
//!
//! Mounted at `/onboarding` by `api_routes()`.
//!
//! ```text
//! POST   /                          initialize
//! GET    /                          get_wizard
//! PUT    /steps/{step}              complete_step
//! POST   /steps/{step}/validity     set_validity
//! GET    /steps/{step}/reachable    reachable
//! POST   /navigate                  navigate
//! POST   /documents/{type}          upload_document (multipart `file`)
//! DELETE /documents/{type}          remove_document
//! GET    /documents/{type}/url      document_url
//! POST   /photo                     upload_photo (multipart `file`)
//! POST   /submit                    submit
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::onboarding;
use crate::state::AppState;

/// Body limit on upload routes. Above the 10 MiB file limit so an oversized
/// file reaches the upload checks and is rejected with a reason.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    let uploads = Router::new()
        .route(
            "/documents/{document_type}",
            post(onboarding::upload_document).delete(onboarding::remove_document),
        )
        .route("/photo", post(onboarding::upload_photo))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        .route(
            "/",
            get(onboarding::get_wizard).post(onboarding::initialize),
        )
        .route("/steps/{step}", put(onboarding::complete_step))
        .route("/steps/{step}/validity", post(onboarding::set_validity))
        .route("/steps/{step}/reachable", get(onboarding::reachable))
        .route("/navigate", post(onboarding::navigate))
        .route("/documents/{document_type}/url", get(onboarding::document_url))
        .route("/submit", post(onboarding::submit))
        .merge(uploads)
}
