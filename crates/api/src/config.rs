use std::path::PathBuf;
use std::time::Duration;

use workbridge_core::uploads::UploadLimits;
use workbridge_wizard::WizardConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub wizard: WizardConfig,
    /// Upload attempts allowed per onboarding per window.
    pub upload_rate_limit: u32,
    pub upload_rate_window: Duration,
    /// Live wizard sessions untouched this long are flushed and dropped.
    pub session_idle_timeout: Duration,
    /// How often idle sessions and recovered rate-limit keys are swept.
    pub maintenance_interval: Duration,
}

/// Where uploaded objects live and how their URLs are signed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    /// HMAC key for signed download URLs.
    pub signing_secret: String,
}

fn env_or<T: std::str::FromStr>(name: &str, default: &str) -> T {
    std::env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                   |
    /// |---------------------------|---------------------------|
    /// | `HOST`                    | `0.0.0.0`                 |
    /// | `PORT`                    | `3000`                    |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                      |
    /// | `AUTOSAVE_DELAY_MS`       | `800`                     |
    /// | `SAVED_INDICATOR_TTL_MS`  | `2000`                    |
    /// | `READ_ONLY_AFTER_SUBMIT`  | `true`                    |
    /// | `STORAGE_ROOT`            | `storage/onboarding`      |
    /// | `STORAGE_SIGNING_SECRET`  | value of `JWT_SECRET`     |
    /// | `SIGNED_URL_TTL_SECS`     | `300`                     |
    /// | `UPLOAD_RATE_LIMIT`       | `5`                       |
    /// | `UPLOAD_RATE_WINDOW_SECS` | `60`                      |
    /// | `SESSION_IDLE_SECS`       | `1800`                    |
    /// | `MAINTENANCE_INTERVAL_SECS` | `60`                    |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", "3000");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30");
        let jwt = JwtConfig::from_env();

        let storage = StorageConfig {
            root: std::env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "storage/onboarding".into())
                .into(),
            signing_secret: std::env::var("STORAGE_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| jwt.secret.clone()),
        };

        let wizard = WizardConfig {
            autosave_delay: Duration::from_millis(env_or("AUTOSAVE_DELAY_MS", "800")),
            saved_indicator_ttl: Duration::from_millis(env_or("SAVED_INDICATOR_TTL_MS", "2000")),
            read_only_after_submit: env_or("READ_ONLY_AFTER_SUBMIT", "true"),
            signed_url_ttl: Duration::from_secs(env_or("SIGNED_URL_TTL_SECS", "300")),
            upload_limits: UploadLimits::default(),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            storage,
            wizard,
            upload_rate_limit: env_or("UPLOAD_RATE_LIMIT", "5"),
            upload_rate_window: Duration::from_secs(env_or("UPLOAD_RATE_WINDOW_SECS", "60")),
            session_idle_timeout: Duration::from_secs(env_or("SESSION_IDLE_SECS", "1800")),
            maintenance_interval: Duration::from_secs(env_or("MAINTENANCE_INTERVAL_SECS", "60")),
        }
    }
}
