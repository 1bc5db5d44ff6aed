//! Program version repository.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;
use progstore_entity::file::{CreateProgramVersion, ProgramVersion};

/// Repository for `program_versions`.
#[derive(Debug, Clone)]
pub struct VersionRepository {
    pool: PgPool,
}

impl VersionRepository {
    /// Create a new version repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a version by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ProgramVersion>> {
        sqlx::query_as::<_, ProgramVersion>("SELECT * FROM program_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find version", e))
    }

    /// Find the newest version record of a program with a given label.
    pub async fn find_by_label(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Option<ProgramVersion>> {
        sqlx::query_as::<_, ProgramVersion>(
            "SELECT * FROM program_versions WHERE program_id = $1 AND version = $2 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(program_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find version", e))
    }

    /// Version records of a program, newest first.
    pub async fn find_by_program(&self, program_id: Uuid) -> AppResult<Vec<ProgramVersion>> {
        sqlx::query_as::<_, ProgramVersion>(
            "SELECT * FROM program_versions WHERE program_id = $1 ORDER BY created_at DESC",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list versions", e))
    }

    /// Insert a version record (not current).
    pub async fn create(&self, data: &CreateProgramVersion) -> AppResult<ProgramVersion> {
        sqlx::query_as::<_, ProgramVersion>(
            "INSERT INTO program_versions (id, program_id, version, file_id, uploaded_by, \
             change_log, is_current) VALUES ($1, $2, $3, $4, $5, $6, FALSE) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.program_id)
        .bind(&data.version)
        .bind(data.file_id)
        .bind(data.uploaded_by)
        .bind(&data.change_log)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create version", e))
    }

    /// Make one version current inside a single transaction.
    ///
    /// Siblings are cleared before the target is set, which the partial
    /// unique index on `is_current` requires.
    pub async fn set_current(
        &self,
        program_id: Uuid,
        version_id: Uuid,
    ) -> AppResult<ProgramVersion> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(
            "UPDATE program_versions SET is_current = FALSE, updated_at = NOW() \
             WHERE program_id = $1 AND id <> $2 AND is_current",
        )
        .bind(program_id)
        .bind(version_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to clear current version"))?;

        let version = sqlx::query_as::<_, ProgramVersion>(
            "UPDATE program_versions SET is_current = TRUE, updated_at = NOW() \
             WHERE id = $1 AND program_id = $2 RETURNING *",
        )
        .bind(version_id)
        .bind(program_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to set current version"))?
        .ok_or_else(|| {
            AppError::not_found(format!(
                "Version {version_id} not found for program {program_id}"
            ))
        })?;

        sqlx::query("UPDATE programs SET version = $2, updated_at = NOW() WHERE id = $1")
            .bind(program_id)
            .bind(&version.version)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update program version label"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit current version"))?;

        debug!(%program_id, %version_id, version = %version.version, "Current version switched");
        Ok(version)
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}
