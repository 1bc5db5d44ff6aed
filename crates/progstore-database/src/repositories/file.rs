//! Stored file repository.

use sqlx::PgPool;
use uuid::Uuid;

use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;
use progstore_entity::file::{CreateStoredFile, StoredFile};

/// Repository for `program_files`.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<StoredFile>> {
        sqlx::query_as::<_, StoredFile>("SELECT * FROM program_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// All files, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<StoredFile>> {
        sqlx::query_as::<_, StoredFile>("SELECT * FROM program_files ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// Files of a program.
    pub async fn find_by_program(&self, program_id: Uuid) -> AppResult<Vec<StoredFile>> {
        sqlx::query_as::<_, StoredFile>(
            "SELECT * FROM program_files WHERE program_id = $1 \
             ORDER BY version DESC, created_at DESC",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list program files", e))
    }

    /// Files of one version of a program.
    pub async fn find_by_version(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Vec<StoredFile>> {
        sqlx::query_as::<_, StoredFile>(
            "SELECT * FROM program_files WHERE program_id = $1 AND version = $2 \
             ORDER BY created_at DESC",
        )
        .bind(program_id)
        .bind(version)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list version files", e))
    }

    /// Insert a new file row.
    pub async fn create(&self, data: &CreateStoredFile) -> AppResult<StoredFile> {
        sqlx::query_as::<_, StoredFile>(
            "INSERT INTO program_files (id, program_id, file_name, file_path, file_size, \
             file_type, version, uploaded_by, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.program_id)
        .bind(&data.file_name)
        .bind(&data.file_path)
        .bind(data.file_size)
        .bind(&data.file_type)
        .bind(&data.version)
        .bind(data.uploaded_by)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create file", e))
    }

    /// Update the storage-relative path of a file.
    pub async fn update_path(&self, id: Uuid, file_path: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE program_files SET file_path = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(file_path)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update file path", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("File {id} not found")));
        }
        Ok(())
    }

    /// Delete a file row.
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM program_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;
        Ok(result.rows_affected() > 0)
    }
}
