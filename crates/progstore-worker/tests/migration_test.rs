//! Layout migration against the in-memory metadata store.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_database::{MemoryMetadataStore, MetadataStore};
use progstore_entity::file::{CreateProgramVersion, CreateStoredFile, ProgramVersion, StoredFile};
use progstore_entity::migration::MigrationState;
use progstore_entity::program::{ProductionLine, Program, VehicleModel};
use progstore_worker::MigrationEngine;

/// Delegates to the in-memory store but refuses path updates.
#[derive(Debug)]
struct ReadOnlyPaths(Arc<MemoryMetadataStore>);

#[async_trait]
impl MetadataStore for ReadOnlyPaths {
    async fn find_program(&self, id: Uuid) -> AppResult<Option<Program>> {
        self.0.find_program(id).await
    }

    async fn find_production_line(&self, id: Uuid) -> AppResult<Option<ProductionLine>> {
        self.0.find_production_line(id).await
    }

    async fn find_vehicle_model(&self, id: Uuid) -> AppResult<Option<VehicleModel>> {
        self.0.find_vehicle_model(id).await
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<StoredFile>> {
        self.0.find_file(id).await
    }

    async fn list_files(&self) -> AppResult<Vec<StoredFile>> {
        self.0.list_files().await
    }

    async fn files_for_program(&self, program_id: Uuid) -> AppResult<Vec<StoredFile>> {
        self.0.files_for_program(program_id).await
    }

    async fn files_for_version(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Vec<StoredFile>> {
        self.0.files_for_version(program_id, version).await
    }

    async fn create_file(&self, data: &CreateStoredFile) -> AppResult<StoredFile> {
        self.0.create_file(data).await
    }

    async fn update_file_path(&self, _id: Uuid, _file_path: &str) -> AppResult<()> {
        Err(AppError::database("connection reset by peer"))
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        self.0.delete_file(id).await
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<ProgramVersion>> {
        self.0.find_version(id).await
    }

    async fn find_version_by_label(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Option<ProgramVersion>> {
        self.0.find_version_by_label(program_id, version).await
    }

    async fn versions_for_program(&self, program_id: Uuid) -> AppResult<Vec<ProgramVersion>> {
        self.0.versions_for_program(program_id).await
    }

    async fn create_version(&self, data: &CreateProgramVersion) -> AppResult<ProgramVersion> {
        self.0.create_version(data).await
    }

    async fn set_current_version(
        &self,
        program_id: Uuid,
        version_id: Uuid,
    ) -> AppResult<ProgramVersion> {
        self.0.set_current_version(program_id, version_id).await
    }
}

async fn seed(store: &MemoryMetadataStore, uploads: &Path, stored_path: &str) -> StoredFile {
    let vehicle = store.insert_vehicle_model("QC25", "QC25").await;
    let line = store.insert_production_line("LineA", "LA").await;
    let program = store
        .insert_program("ProgramName", "P001", line.id, vehicle.id)
        .await;

    let path = uploads.join(stored_path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"0\nSECTION\n").unwrap();

    let file_name = Path::new(stored_path)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    store
        .create_file(&CreateStoredFile {
            program_id: program.id,
            file_name,
            file_path: stored_path.to_string(),
            file_size: 10,
            file_type: Some("dxf".into()),
            version: "1.0".into(),
            uploaded_by: None,
            description: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_flat_file_moves_into_canonical_layout_and_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let backups = dir.path().join("backups");
    let store = Arc::new(MemoryMetadataStore::new());
    let file = seed(&store, &uploads, "legacy.dxf").await;

    let engine = MigrationEngine::new(store.clone(), &uploads, &backups);
    let handle = engine.start().await.unwrap();
    assert_eq!(handle.initial_status().status, MigrationState::Running);
    let status = handle.wait().await.unwrap();

    assert_eq!(status.status, MigrationState::Completed);
    assert_eq!(status.migrated_files, 1);
    let moved = store.find_file(file.id).await.unwrap().unwrap();
    assert_eq!(moved.file_path, "QC25/LineA/P001_ProgramName/1.0/legacy.dxf");
    assert!(uploads.join("QC25/LineA/P001_ProgramName/1.0/legacy.dxf").is_file());

    let pre_migration: Vec<_> = fs::read_dir(&backups)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("pre_migration_backup_"))
        .collect();
    assert_eq!(pre_migration.len(), 1);

    let report = engine.rollback().await.unwrap();
    assert!(report.from_manifest);
    assert_eq!(report.restored, vec!["legacy.dxf".to_string()]);
    assert!(uploads.join("legacy.dxf").is_file());
    assert_eq!(engine.status().await.status, MigrationState::Completed);
}

#[tokio::test]
async fn test_nested_path_counts_as_already_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let store = Arc::new(MemoryMetadataStore::new());
    let file = seed(&store, &uploads, "old/nested.dxf").await;

    let engine = MigrationEngine::new(store.clone(), &uploads, dir.path().join("backups"));
    let status = engine.start().await.unwrap().wait().await.unwrap();
    assert_eq!(status.migrated_files, 1);
    let unchanged = store.find_file(file.id).await.unwrap().unwrap();
    assert_eq!(unchanged.file_path, "old/nested.dxf");
}

#[tokio::test]
async fn test_failed_metadata_update_moves_file_back() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let memory = Arc::new(MemoryMetadataStore::new());
    let file = seed(&memory, &uploads, "legacy.dxf").await;

    let store = Arc::new(ReadOnlyPaths(memory.clone()));
    let engine = MigrationEngine::new(store, &uploads, dir.path().join("backups"));
    let status = engine.start().await.unwrap().wait().await.unwrap();

    assert_eq!(status.status, MigrationState::Completed);
    assert_eq!(status.failed_files, 1);
    assert_eq!(status.migrated_files, 0);
    assert!(uploads.join("legacy.dxf").is_file());
    assert!(!uploads.join("QC25/LineA/P001_ProgramName/1.0/legacy.dxf").exists());

    assert_eq!(status.errors.len(), 2);
    assert!(status.errors[0].contains("moved back to its original location"));
    assert!(status.errors[1].contains("metadata update failed"));

    let row = memory.find_file(file.id).await.unwrap().unwrap();
    assert_eq!(row.file_path, "legacy.dxf");
}

#[tokio::test]
async fn test_rollback_from_explicit_run_dir() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let backups = dir.path().join("backups");
    let store = Arc::new(MemoryMetadataStore::new());
    seed(&store, &uploads, "legacy.dxf").await;

    let engine = MigrationEngine::new(store.clone(), &uploads, &backups);
    engine.start().await.unwrap().wait().await.unwrap();
    fs::remove_file(uploads.join("QC25/LineA/P001_ProgramName/1.0/legacy.dxf")).unwrap();

    let run_dir = fs::read_dir(backups.join("file_migration"))
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .next()
        .unwrap();

    // A fresh engine has no completed run, but an explicit directory works.
    let fresh = MigrationEngine::new(store, &uploads, &backups);
    assert!(fresh.rollback().await.is_err());
    let report = fresh.rollback_from(&run_dir).await.unwrap();
    assert_eq!(report.restored.len(), 1);
    assert!(uploads.join("legacy.dxf").is_file());
}

#[tokio::test]
async fn test_setup_failure_fails_run_without_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let backups = dir.path().join("backups");
    fs::write(&backups, b"not a directory").unwrap();
    let store = Arc::new(MemoryMetadataStore::new());
    let file = seed(&store, &uploads, "legacy.dxf").await;

    let engine = MigrationEngine::new(store.clone(), &uploads, &backups);
    let status = engine.start().await.unwrap().wait().await.unwrap();

    assert_eq!(status.status, MigrationState::Failed);
    assert!(status.error_msg.unwrap().starts_with("Migration setup failed"));
    assert_eq!(status.migrated_files, 0);
    assert_eq!(status.failed_files, 0);
    assert!(uploads.join("legacy.dxf").is_file());
    let row = store.find_file(file.id).await.unwrap().unwrap();
    assert_eq!(row.file_path, "legacy.dxf");

    // A failed run cannot be rolled back.
    assert!(engine.rollback().await.is_err());
}
