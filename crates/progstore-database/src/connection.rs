//! PostgreSQL connection pool for the metadata store.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use progstore_core::config::DatabaseConfig;
use progstore_core::error::{AppError, ErrorKind};

use crate::credentials::mask_password;

/// Name reported to the server in `pg_stat_activity`.
const APPLICATION_NAME: &str = "progstore";

/// sqlx pool sized and timed from [`DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Parse the configured URL and open the pool.
    ///
    /// A malformed URL is a `Configuration` error; an unreachable server a
    /// `Database` error.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let masked = mask_password(&config.url);
        let options = connect_options(config)?;
        info!(url = %masked, max_connections = config.max_connections, "Opening metadata store");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to {masked}: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Borrow the pool, e.g. for schema migrations.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Hand the pool to a store.
    pub fn into_pool(self) -> PgPool {
        self.pool
    }
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, AppError> {
    let options: PgConnectOptions = config.url.parse().map_err(|e| {
        AppError::configuration(format!(
            "Invalid database.url {}: {e}",
            mask_password(&config.url)
        ))
    })?;
    Ok(options.application_name(APPLICATION_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_seconds: 1,
            idle_timeout_seconds: 1,
        }
    }

    #[test]
    fn test_connect_options_from_url() {
        let options = connect_options(&config("postgres://progstore:secret@db:5433/programs"))
            .unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("programs"));
        assert_eq!(options.get_application_name(), Some(APPLICATION_NAME));
    }

    #[tokio::test]
    async fn test_malformed_url_is_configuration_error() {
        let err = DatabasePool::connect(&config("not a url")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
