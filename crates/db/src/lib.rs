//! Postgres persistence for worker onboarding.
//!
//! Row models live in [`models`], zero-sized query helpers in
//! [`repositories`], and [`gateway::PgOnboardingGateway`] composes them into
//! the `OnboardingGateway` seam the wizard talks to.

pub mod gateway;
pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

pub use gateway::PgOnboardingGateway;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
