use std::sync::Arc;

use workbridge_core::signing::UrlSigner;
use workbridge_core::storage::ObjectStorage;

use crate::config::ServerConfig;
use crate::sessions::WizardSessions;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database pool. `None` when running over the in-memory gateway.
    pub pool: Option<workbridge_db::DbPool>,
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<WizardSessions>,
    pub storage: Arc<dyn ObjectStorage>,
    /// Verifies the signatures on `/files` URLs.
    pub signer: UrlSigner,
}
