//! The layout migration run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_core::types::MigrationRunId;
use progstore_database::MetadataStore;
use progstore_entity::file::StoredFile;
use progstore_entity::migration::{MigrationState, MigrationStatus};
use progstore_service::ProgramContext;
use progstore_service::backup::naming;
use progstore_storage::archive;
use progstore_storage::filesystem::{copy_file, is_dir, is_file, move_file};
use progstore_storage::is_already_migrated;
use progstore_storage::paths::{relative_to, resolve_within, safe_relative};

use super::manifest::{ManifestEntry, MigrationManifest};
use super::rollback::{self, RollbackReport};
use super::state::MigrationTracker;

/// Error recorded when a run is cancelled.
pub const CANCELLED: &str = "cancelled";

/// What happened to one file.
enum Step {
    /// Already in the canonical layout.
    Skipped,
    /// Moved and re-pointed.
    Moved,
}

/// A running migration.
#[derive(Debug)]
pub struct MigrationHandle {
    run_id: MigrationRunId,
    initial: MigrationStatus,
    cancel: CancellationToken,
    join: JoinHandle<MigrationStatus>,
}

impl MigrationHandle {
    /// Id of the run.
    pub fn run_id(&self) -> MigrationRunId {
        self.run_id
    }

    /// Status as it was when the run was accepted.
    pub fn initial_status(&self) -> &MigrationStatus {
        &self.initial
    }

    /// Ask the run to stop before its next file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end and return its final status.
    pub async fn wait(self) -> AppResult<MigrationStatus> {
        self.join
            .await
            .map_err(|e| AppError::internal(format!("Migration task failed: {e}")))
    }
}

/// Moves legacy flat-layout files into the canonical hierarchy.
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    store: Arc<dyn MetadataStore>,
    upload_root: PathBuf,
    backup_root: PathBuf,
    tracker: MigrationTracker,
}

impl MigrationEngine {
    /// Create an engine with its own status tracker.
    pub fn new(
        store: Arc<dyn MetadataStore>,
        upload_root: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            upload_root: upload_root.into(),
            backup_root: backup_root.into(),
            tracker: MigrationTracker::new(),
        }
    }

    /// The status tracker.
    pub fn tracker(&self) -> &MigrationTracker {
        &self.tracker
    }

    /// Point-in-time copy of the status.
    pub async fn status(&self) -> MigrationStatus {
        self.tracker.snapshot().await
    }

    /// Start a run in the background. `Conflict` if one is running.
    pub async fn start(&self) -> AppResult<MigrationHandle> {
        self.start_with(CancellationToken::new()).await
    }

    /// Start a run in the background, stopping when `cancel` fires.
    pub async fn start_with(&self, cancel: CancellationToken) -> AppResult<MigrationHandle> {
        let run_id = MigrationRunId::new();
        let initial = self.tracker.try_begin(run_id).await?;
        tracing::info!("Migration run {} accepted", run_id);

        let engine = self.clone();
        let token = cancel.clone();
        let span = info_span!("migration", run_id = %run_id);
        let join = tokio::spawn(async move { engine.run(run_id, token).await }.instrument(span));

        Ok(MigrationHandle {
            run_id,
            initial,
            cancel,
            join,
        })
    }

    /// Copy the newest run's backups back into their original locations.
    ///
    /// Only allowed after a completed run. Metadata paths are not reverted
    /// and the status is left as it is.
    pub async fn rollback(&self) -> AppResult<RollbackReport> {
        let status = self.tracker.snapshot().await;
        if status.status != MigrationState::Completed {
            return Err(AppError::conflict(format!(
                "Only a completed migration can be rolled back (status: {})",
                status.status
            )));
        }

        let runs_root = self.backup_root.join(naming::MIGRATION_DIR);
        let run_dir = rollback::latest_run_dir(&runs_root).await?.ok_or_else(|| {
            AppError::not_found(format!("No migration backups under {}", runs_root.display()))
        })?;
        self.rollback_from(&run_dir).await
    }

    /// Roll back from an explicit run directory, regardless of status.
    pub async fn rollback_from(&self, run_dir: &Path) -> AppResult<RollbackReport> {
        rollback::restore_run(run_dir, &self.upload_root).await
    }

    async fn run(&self, run_id: MigrationRunId, cancel: CancellationToken) -> MigrationStatus {
        let run_dir = match self.prepare().await {
            Ok(dir) => dir,
            Err(e) => return self.fail(format!("Migration setup failed: {e}")).await,
        };

        let files = match self.store.list_files().await {
            Ok(files) => files,
            Err(e) => return self.fail(format!("Failed to list stored files: {e}")).await,
        };

        let total = files.len();
        self.tracker
            .update(|s| {
                s.total_files = total;
                s.set_progress(0);
            })
            .await;
        tracing::info!("Migrating {} files, backups in {}", total, run_dir.display());

        let mut manifest = MigrationManifest::new(run_id);
        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Migration cancelled after {} of {} files", index, total);
                return self.fail(CANCELLED.to_string()).await;
            }

            self.tracker
                .update(|s| {
                    s.current_file = file.file_name.clone();
                    s.set_progress(index);
                })
                .await;

            let outcome = self.migrate_file(file, &run_dir, &mut manifest).await;
            match &outcome {
                Ok(Step::Skipped) => {
                    tracing::debug!("File {} already in canonical layout", file.file_name)
                }
                Ok(Step::Moved) => tracing::info!("File {} migrated", file.file_name),
                Err(message) => tracing::warn!("{}", message),
            }

            self.tracker
                .update(|s| {
                    match outcome {
                        Ok(_) => s.migrated_files += 1,
                        Err(message) => {
                            s.failed_files += 1;
                            s.record_error(message);
                        }
                    }
                    s.set_progress(index + 1);
                })
                .await;
        }

        let mut final_status = MigrationStatus::default();
        self.tracker
            .update(|s| {
                s.finish(MigrationState::Completed);
                final_status = s.clone();
            })
            .await;
        tracing::info!(
            "Migration completed: {} migrated, {} failed",
            final_status.migrated_files,
            final_status.failed_files
        );
        final_status
    }

    /// Create the run directory and the pre-migration archive.
    async fn prepare(&self) -> AppResult<PathBuf> {
        let ts = naming::timestamp();
        let run_dir = create_run_dir(&self.backup_root.join(naming::MIGRATION_DIR), &ts).await?;

        if is_dir(&self.upload_root).await {
            let source = self.upload_root.clone();
            let dest = self.backup_root.join(naming::pre_migration_name(&ts));
            let summary = {
                let dest = dest.clone();
                archive::run_blocking(move || archive::build_tree_archive(&source, &dest)).await?
            };
            tracing::info!(
                "Pre-migration backup {} written ({} files)",
                dest.display(),
                summary.files
            );
        }
        Ok(run_dir)
    }

    /// Relocate one file. Errors are per-file messages for the trail.
    async fn migrate_file(
        &self,
        file: &StoredFile,
        run_dir: &Path,
        manifest: &mut MigrationManifest,
    ) -> Result<Step, String> {
        if is_already_migrated(&file.file_path) {
            return Ok(Step::Skipped);
        }
        let failed = |reason: String| format!("{} ({}): {reason}", file.file_name, file.id);

        let source =
            resolve_within(&self.upload_root, &file.file_path).map_err(|e| failed(e.message))?;
        if !is_file(&source).await {
            return Err(failed("source file not found".to_string()));
        }

        let ctx = ProgramContext::load(self.store.as_ref(), file.program_id)
            .await
            .map_err(|e| failed(e.message))?;

        if safe_relative(&file.file_name).is_none_or(|p| p.components().count() != 1) {
            return Err(failed("file name is not a single path segment".to_string()));
        }
        let target = ctx
            .coordinates(&file.version)
            .file_path(&self.upload_root, &file.file_name);
        let new_path = relative_to(&self.upload_root, &target).map_err(|e| failed(e.message))?;

        let backup_name = backup_name_for(file, manifest);
        copy_file(&source, &run_dir.join(&backup_name))
            .await
            .map_err(|e| failed(format!("backup copy failed: {e}")))?;
        manifest.entries.push(ManifestEntry {
            file_id: file.id,
            original_path: file.file_path.clone(),
            backup_name,
            new_path: new_path.clone(),
        });
        if let Err(e) = manifest.save(run_dir).await {
            return Err(failed(format!("manifest write failed: {e}")));
        }

        move_file(&source, &target)
            .await
            .map_err(|e| failed(format!("move failed: {e}")))?;

        if let Err(e) = self.store.update_file_path(file.id, &new_path).await {
            let compensation = match move_file(&target, &source).await {
                Ok(()) => "file moved back to its original location".to_string(),
                Err(undo) => format!("moving the file back failed: {undo}"),
            };
            tracing::warn!("Compensation for {}: {}", file.file_name, compensation);
            self.tracker
                .update(|s| s.record_error(failed(format!("compensation: {compensation}"))))
                .await;
            return Err(failed(format!("metadata update failed: {}", e.message)));
        }

        Ok(Step::Moved)
    }

    async fn fail(&self, message: String) -> MigrationStatus {
        tracing::error!("{}", message);
        let mut final_status = MigrationStatus::default();
        self.tracker
            .update(|s| {
                s.record_error(message);
                s.finish(MigrationState::Failed);
                final_status = s.clone();
            })
            .await;
        final_status
    }
}

/// Base name of the stored path, prefixed with the file id on collision.
fn backup_name_for(file: &StoredFile, manifest: &MigrationManifest) -> String {
    let base = Path::new(&file.file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.id.to_string());
    if manifest.has_backup_name(&base) || base == super::manifest::MANIFEST_FILE {
        format!("{}_{base}", file.id)
    } else {
        base
    }
}

/// Create `<parent>/<ts>`, or `<parent>/<ts>_<n>` when a run of the same
/// second already exists.
async fn create_run_dir(parent: &Path, ts: &str) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(parent).await?;
    let mut candidate = parent.join(ts);
    let mut attempt = 1;
    loop {
        match tokio::fs::create_dir(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 => {
                candidate = parent.join(format!("{ts}_{attempt}"));
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use progstore_core::error::ErrorKind;
    use progstore_database::MemoryMetadataStore;
    use progstore_entity::file::CreateStoredFile;

    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
        store: Arc<MemoryMetadataStore>,
        engine: MigrationEngine,
        program_id: uuid::Uuid,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(MemoryMetadataStore::new());
            let vehicle = store.insert_vehicle_model("QC25", "QC25").await;
            let line = store.insert_production_line("LineA", "LA").await;
            let program = store
                .insert_program("ProgramName", "P001", line.id, vehicle.id)
                .await;
            let engine = MigrationEngine::new(
                store.clone(),
                dir.path().join("uploads"),
                dir.path().join("backups"),
            );
            Self {
                dir,
                store,
                engine,
                program_id: program.id,
            }
        }

        fn uploads(&self) -> PathBuf {
            self.dir.path().join("uploads")
        }

        async fn legacy_file(&self, name: &str) -> StoredFile {
            fs::create_dir_all(self.uploads()).unwrap();
            fs::write(self.uploads().join(name), name.as_bytes()).unwrap();
            self.store
                .create_file(&CreateStoredFile {
                    program_id: self.program_id,
                    file_name: name.to_string(),
                    file_path: name.to_string(),
                    file_size: name.len() as i64,
                    file_type: None,
                    version: "1.0".into(),
                    uploaded_by: None,
                    description: None,
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_legacy_file_is_relocated() {
        let fx = Fixture::new().await;
        let file = fx.legacy_file("legacy.dxf").await;

        let status = fx.engine.start().await.unwrap().wait().await.unwrap();

        assert_eq!(status.status, MigrationState::Completed);
        assert_eq!(status.migrated_files, 1);
        assert_eq!(status.failed_files, 0);
        assert_eq!(status.progress, 100.0);
        let moved = fx.store.find_file(file.id).await.unwrap().unwrap();
        assert_eq!(moved.file_path, "QC25/LineA/P001_ProgramName/1.0/legacy.dxf");
        assert!(fx.uploads().join(&moved.file_path).is_file());
        assert!(!fx.uploads().join("legacy.dxf").exists());
    }

    #[tokio::test]
    async fn test_start_while_running_conflicts() {
        let fx = Fixture::new().await;
        fx.legacy_file("legacy.dxf").await;

        let handle = fx.engine.start().await.unwrap();
        let err = fx.engine.start().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(fx.engine.status().await.run_id, Some(handle.run_id()));

        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_source_is_per_file_failure() {
        let fx = Fixture::new().await;
        let ghost = fx.legacy_file("ghost.nc").await;
        fs::remove_file(fx.uploads().join("ghost.nc")).unwrap();
        fx.legacy_file("real.nc").await;

        let status = fx.engine.start().await.unwrap().wait().await.unwrap();
        assert_eq!(status.status, MigrationState::Completed);
        assert_eq!(status.migrated_files, 1);
        assert_eq!(status.failed_files, 1);
        assert!(status.errors[0].contains(&ghost.id.to_string()));
        assert!(status.error_msg.unwrap().contains("source file not found"));
    }

    #[tokio::test]
    async fn test_cancelled_run_fails() {
        let fx = Fixture::new().await;
        fx.legacy_file("legacy.dxf").await;

        let token = CancellationToken::new();
        token.cancel();
        let status = fx.engine.start_with(token).await.unwrap().wait().await.unwrap();
        assert_eq!(status.status, MigrationState::Failed);
        assert_eq!(status.error_msg.as_deref(), Some(CANCELLED));
        assert!(fx.uploads().join("legacy.dxf").is_file());
    }

    #[tokio::test]
    async fn test_rollback_requires_completed_run() {
        let fx = Fixture::new().await;
        let err = fx.engine.rollback().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_backup_name_collision_uses_file_id() {
        let mut manifest = MigrationManifest::default();
        let file = StoredFile {
            id: uuid::Uuid::new_v4(),
            program_id: uuid::Uuid::nil(),
            file_name: "a.nc".into(),
            file_path: "a.nc".into(),
            file_size: 0,
            file_type: None,
            version: "1".into(),
            uploaded_by: None,
            description: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(backup_name_for(&file, &manifest), "a.nc");
        manifest.entries.push(ManifestEntry {
            file_id: uuid::Uuid::new_v4(),
            original_path: "a.nc".into(),
            backup_name: "a.nc".into(),
            new_path: "x/a.nc".into(),
        });
        assert_eq!(backup_name_for(&file, &manifest), format!("{}_a.nc", file.id));
    }
}
