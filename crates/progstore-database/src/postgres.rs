//! PostgreSQL-backed metadata store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use progstore_core::result::AppResult;
use progstore_entity::file::{CreateProgramVersion, CreateStoredFile, ProgramVersion, StoredFile};
use progstore_entity::program::{ProductionLine, Program, VehicleModel};

use crate::repositories::{FileRepository, ProgramRepository, VersionRepository};
use crate::store::MetadataStore;

/// [`MetadataStore`] over the PostgreSQL repositories.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    programs: ProgramRepository,
    files: FileRepository,
    versions: VersionRepository,
}

impl PgMetadataStore {
    /// Create a store sharing one connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            programs: ProgramRepository::new(pool.clone()),
            files: FileRepository::new(pool.clone()),
            versions: VersionRepository::new(pool),
        }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn find_program(&self, id: Uuid) -> AppResult<Option<Program>> {
        self.programs.find_program(id).await
    }

    async fn find_production_line(&self, id: Uuid) -> AppResult<Option<ProductionLine>> {
        self.programs.find_production_line(id).await
    }

    async fn find_vehicle_model(&self, id: Uuid) -> AppResult<Option<VehicleModel>> {
        self.programs.find_vehicle_model(id).await
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<StoredFile>> {
        self.files.find_by_id(id).await
    }

    async fn list_files(&self) -> AppResult<Vec<StoredFile>> {
        self.files.find_all().await
    }

    async fn files_for_program(&self, program_id: Uuid) -> AppResult<Vec<StoredFile>> {
        self.files.find_by_program(program_id).await
    }

    async fn files_for_version(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Vec<StoredFile>> {
        self.files.find_by_version(program_id, version).await
    }

    async fn create_file(&self, data: &CreateStoredFile) -> AppResult<StoredFile> {
        self.files.create(data).await
    }

    async fn update_file_path(&self, id: Uuid, file_path: &str) -> AppResult<()> {
        self.files.update_path(id, file_path).await
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        self.files.delete(id).await
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<ProgramVersion>> {
        self.versions.find_by_id(id).await
    }

    async fn find_version_by_label(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Option<ProgramVersion>> {
        self.versions.find_by_label(program_id, version).await
    }

    async fn versions_for_program(&self, program_id: Uuid) -> AppResult<Vec<ProgramVersion>> {
        self.versions.find_by_program(program_id).await
    }

    async fn create_version(&self, data: &CreateProgramVersion) -> AppResult<ProgramVersion> {
        self.versions.create(data).await
    }

    async fn set_current_version(
        &self,
        program_id: Uuid,
        version_id: Uuid,
    ) -> AppResult<ProgramVersion> {
        self.versions.set_current(program_id, version_id).await
    }
}
