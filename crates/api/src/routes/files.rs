use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Signed object downloads, mounted at the root as `/files/{*key}`.
pub fn router() -> Router<AppState> {
    Router::new().route("/files/{*key}", get(files::download))
}
