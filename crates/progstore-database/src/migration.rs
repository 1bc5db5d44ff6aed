//! Schema migration runner.

use sqlx::PgPool;
use tracing::info;

use progstore_core::error::{AppError, ErrorKind};

/// Apply all pending schema migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying schema migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Schema migrations applied");
    Ok(())
}
