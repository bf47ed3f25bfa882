use std::time::Duration;

use workbridge_core::uploads::UploadLimits;

/// Controller knobs. Defaults match the server's environment defaults.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Quiet period before a staged save is sent.
    pub autosave_delay: Duration,
    /// How long the "Saved" indicator lingers before returning to idle.
    pub saved_indicator_ttl: Duration,
    /// Refuse edits once the record has left `draft`, and reopen such
    /// records on the Review step.
    pub read_only_after_submit: bool,
    /// Lifetime of URLs issued for document display.
    pub signed_url_ttl: Duration,
    pub upload_limits: UploadLimits,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            autosave_delay: Duration::from_millis(800),
            saved_indicator_ttl: Duration::from_secs(2),
            read_only_after_submit: true,
            signed_url_ttl: Duration::from_secs(300),
            upload_limits: UploadLimits::default(),
        }
    }
}
