pub mod files;
pub mod health;
pub mod onboarding;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /onboarding                              initialize (POST), current view (GET)
/// /onboarding/steps/{step}                 complete step (PUT)
/// /onboarding/steps/{step}/validity        report live validity (POST)
/// /onboarding/steps/{step}/reachable       navigation check (GET)
/// /onboarding/navigate                     move the step pointer (POST)
/// /onboarding/documents/{type}             upload (POST), remove (DELETE)
/// /onboarding/documents/{type}/url         signed display URL (GET)
/// /onboarding/photo                        profile photo upload (POST)
/// /onboarding/submit                       submit for verification (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/onboarding", onboarding::router())
}
