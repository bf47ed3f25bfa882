//! Periodic sweep of idle wizard sessions and recovered upload rate-limit
//! keys.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use workbridge_core::rate_limit::UploadRateLimiter;

use crate::sessions::WizardSessions;

/// Run the maintenance loop until `cancel` is triggered.
pub async fn run(
    sessions: Arc<WizardSessions>,
    limiter: Arc<UploadRateLimiter>,
    every: Duration,
    idle_for: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = every.as_secs(),
        idle_secs = idle_for.as_secs(),
        "Session maintenance started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session maintenance stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = sessions.evict_idle(idle_for).await;
                limiter.retain_recent();
                if evicted > 0 {
                    tracing::info!(evicted, live = sessions.len(), "Idle wizard sessions dropped");
                } else {
                    tracing::debug!(
                        live = sessions.len(),
                        rate_keys = limiter.tracked(),
                        "Maintenance: nothing to evict"
                    );
                }
            }
        }
    }
}
