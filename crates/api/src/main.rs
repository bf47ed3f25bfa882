use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workbridge_api::background;
use workbridge_api::config::ServerConfig;
use workbridge_api::router::build_app_router;
use workbridge_api::sessions::WizardSessions;
use workbridge_api::state::AppState;
use workbridge_core::rate_limit::UploadRateLimiter;
use workbridge_core::signing::UrlSigner;
use workbridge_db::PgOnboardingGateway;
use workbridge_wizard::local_storage::LocalObjectStorage;
use workbridge_wizard::WizardDeps;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "workbridge_api=debug,workbridge_wizard=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = workbridge_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    workbridge_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    workbridge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Storage ---
    let signer = UrlSigner::new(config.storage.signing_secret.clone().into_bytes(), "/files");
    let storage = Arc::new(LocalObjectStorage::new(
        config.storage.root.clone(),
        signer.clone(),
    ));
    tracing::info!(root = %config.storage.root.display(), "Local object storage ready");

    // --- Wizard sessions ---
    let limiter = Arc::new(UploadRateLimiter::new(
        config.upload_rate_limit,
        config.upload_rate_window,
    ));
    let deps = WizardDeps {
        gateway: Arc::new(PgOnboardingGateway::new(pool.clone())),
        storage: storage.clone(),
        limiter: Arc::clone(&limiter),
        config: config.wizard.clone(),
    };
    let sessions = Arc::new(WizardSessions::new(deps));

    // --- Background maintenance ---
    let maintenance_cancel = CancellationToken::new();
    let maintenance = tokio::spawn(background::maintenance::run(
        Arc::clone(&sessions),
        limiter,
        config.maintenance_interval,
        config.session_idle_timeout,
        maintenance_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        sessions: Arc::clone(&sessions),
        storage,
        signer,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    maintenance_cancel.cancel();
    if let Err(e) = maintenance.await {
        tracing::error!(error = %e, "Maintenance task panicked");
    }
    tracing::info!(live = sessions.len(), "Server stopped, flushing wizard sessions");
    sessions.close_all().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
