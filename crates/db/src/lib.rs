//! PostgreSQL persistence for the evaluation platform.
//!
//! Row structs and DTOs live in [`models`], query code in [`repositories`].
//! The [`gateway`] and [`store`] modules implement the `salescore-core`
//! seams (`DirectoryGateway`, `EvaluationStore`) over a [`DbPool`].

pub mod gateway;
pub mod models;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Cheap connectivity probe for startup and the health endpoint.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply embedded migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Map a sqlx error onto the core taxonomy.
///
/// Connectivity-class failures become `Unavailable` (safe to retry with
/// backoff); everything else is `Internal` with the message logged, not
/// leaked.
pub fn map_db_error(err: sqlx::Error) -> salescore_core::error::CoreError {
    use salescore_core::error::CoreError;
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            tracing::warn!(error = %err, "database unavailable");
            CoreError::Unavailable("Database temporarily unavailable".into())
        }
        _ => {
            tracing::error!(error = %err, "database error");
            CoreError::Internal(format!("Database error: {err}"))
        }
    }
}
