//! Program hierarchy repository (read-only).

use sqlx::PgPool;
use uuid::Uuid;

use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;
use progstore_entity::program::{ProductionLine, Program, VehicleModel};

/// Repository for programs, production lines and vehicle models.
#[derive(Debug, Clone)]
pub struct ProgramRepository {
    pool: PgPool,
}

impl ProgramRepository {
    /// Create a new program repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a program by ID.
    pub async fn find_program(&self, id: Uuid) -> AppResult<Option<Program>> {
        sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find program", e))
    }

    /// Find a production line by ID.
    pub async fn find_production_line(&self, id: Uuid) -> AppResult<Option<ProductionLine>> {
        sqlx::query_as::<_, ProductionLine>("SELECT * FROM production_lines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find production line", e)
            })
    }

    /// Find a vehicle model by ID.
    pub async fn find_vehicle_model(&self, id: Uuid) -> AppResult<Option<VehicleModel>> {
        sqlx::query_as::<_, VehicleModel>("SELECT * FROM vehicle_models WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find vehicle model", e)
            })
    }
}
