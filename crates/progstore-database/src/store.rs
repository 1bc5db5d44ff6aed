//! The metadata store consumed by the storage engine.

use async_trait::async_trait;
use uuid::Uuid;

use progstore_core::result::AppResult;
use progstore_entity::file::{CreateProgramVersion, CreateStoredFile, ProgramVersion, StoredFile};
use progstore_entity::program::{ProductionLine, Program, VehicleModel};

/// Lookup and persistence of the rows the storage engine needs.
///
/// Implementations must make [`set_current_version`](Self::set_current_version)
/// atomic: no reader may observe zero or two current versions of a
/// program while it runs.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug {
    /// Find a program by ID.
    async fn find_program(&self, id: Uuid) -> AppResult<Option<Program>>;

    /// Find a production line by ID.
    async fn find_production_line(&self, id: Uuid) -> AppResult<Option<ProductionLine>>;

    /// Find a vehicle model by ID.
    async fn find_vehicle_model(&self, id: Uuid) -> AppResult<Option<VehicleModel>>;

    /// Find a stored file by ID.
    async fn find_file(&self, id: Uuid) -> AppResult<Option<StoredFile>>;

    /// All stored files, oldest first.
    async fn list_files(&self) -> AppResult<Vec<StoredFile>>;

    /// Files of a program, by version label descending then newest first.
    async fn files_for_program(&self, program_id: Uuid) -> AppResult<Vec<StoredFile>>;

    /// Files of one version of a program, newest first.
    async fn files_for_version(&self, program_id: Uuid, version: &str)
    -> AppResult<Vec<StoredFile>>;

    /// Insert a stored file row.
    async fn create_file(&self, data: &CreateStoredFile) -> AppResult<StoredFile>;

    /// Persist a new storage-relative path for a file. `NotFound` if the
    /// row is gone.
    async fn update_file_path(&self, id: Uuid, file_path: &str) -> AppResult<()>;

    /// Delete a stored file row. Returns whether a row was removed.
    async fn delete_file(&self, id: Uuid) -> AppResult<bool>;

    /// Find a program version by ID.
    async fn find_version(&self, id: Uuid) -> AppResult<Option<ProgramVersion>>;

    /// Find the most recent version record of a program with this label.
    async fn find_version_by_label(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Option<ProgramVersion>>;

    /// Version records of a program, newest first.
    async fn versions_for_program(&self, program_id: Uuid) -> AppResult<Vec<ProgramVersion>>;

    /// Insert a version record, not current.
    async fn create_version(&self, data: &CreateProgramVersion) -> AppResult<ProgramVersion>;

    /// Atomically make `version_id` the only current version of
    /// `program_id` and copy its label onto the program.
    async fn set_current_version(
        &self,
        program_id: Uuid,
        version_id: Uuid,
    ) -> AppResult<ProgramVersion>;
}
