//! Restore of backup artifacts, always preceded by a rollback point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;
use progstore_core::traits::DatabaseDumper;
use progstore_entity::backup::BackupKind;
use progstore_storage::archive;
use progstore_storage::filesystem::{is_dir, is_file};
use progstore_storage::paths::resolve_within;

use super::naming;
use super::scratch::ScratchDir;

/// Result of a restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    /// Human-readable summary.
    pub message: String,
    /// Name of the backup restored from.
    pub restored_from: String,
    /// Name of the rollback point created before anything changed.
    pub rollback_artifact: String,
    /// Archive entries skipped during extraction.
    pub skipped_entries: Vec<String>,
}

/// Replays backups over the live database and program-file tree.
#[derive(Debug, Clone)]
pub struct RestoreManager {
    /// Database dump collaborator.
    dumper: Arc<dyn DatabaseDumper>,
    /// Root of the program-file tree.
    upload_root: PathBuf,
    /// Directory holding the artifacts.
    backup_root: PathBuf,
}

impl RestoreManager {
    /// Creates a new restore manager.
    pub fn new(
        dumper: Arc<dyn DatabaseDumper>,
        upload_root: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dumper,
            upload_root: upload_root.into(),
            backup_root: backup_root.into(),
        }
    }

    /// Restore the database from a database or full backup.
    ///
    /// A dump of the current database is written first; if that fails
    /// nothing else happens.
    #[instrument(skip(self))]
    pub async fn restore_database(&self, name: &str) -> AppResult<RestoreOutcome> {
        let (path, kind) = self
            .locate(name, &[BackupKind::Database, BackupKind::Full])
            .await?;

        let ts = naming::timestamp();
        let rollback_name = naming::rollback_database_name(&ts);
        self.dumper
            .dump(&self.backup_root.join(&rollback_name))
            .await
            .map_err(|e| rollback_failed(e, "database"))?;
        info!(rollback = %rollback_name, "Database rollback point created");

        match kind {
            BackupKind::Full => {
                let scratch = self.extract_full(&path, &ts).await?;
                let staged = scratch.path().to_path_buf();
                let dump = archive::run_blocking(move || archive::find_database_dump(&staged))
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found(format!("Backup {name} contains no database dump"))
                    })?;
                self.dumper.restore(&dump).await?;
                let _ = scratch.close().await;
            }
            _ => self.dumper.restore(&path).await?,
        }

        info!(backup = %name, rollback = %rollback_name, "Database restored");
        Ok(RestoreOutcome {
            message: format!("Database restored from {name}"),
            restored_from: name.to_string(),
            rollback_artifact: rollback_name,
            skipped_entries: Vec::new(),
        })
    }

    /// Replace the program-file tree with the one in a files or full
    /// backup.
    ///
    /// The current tree is archived first (an empty placeholder when the
    /// root is absent); if that fails nothing else happens. The restore
    /// is a destructive replace, not a merge.
    #[instrument(skip(self))]
    pub async fn restore_files(&self, name: &str) -> AppResult<RestoreOutcome> {
        let (path, kind) = self
            .locate(name, &[BackupKind::Files, BackupKind::Full])
            .await?;

        let ts = naming::timestamp();
        let rollback_name = naming::rollback_files_name(&ts);
        self.snapshot_tree(&self.backup_root.join(&rollback_name))
            .await
            .map_err(|e| rollback_failed(e, "files"))?;
        info!(rollback = %rollback_name, "Files rollback point created");

        let mut scratch = None;
        let source = match kind {
            BackupKind::Full => {
                let extracted = self.extract_full(&path, &ts).await?;
                let staged = extracted.path().to_path_buf();
                let files = archive::run_blocking(move || archive::find_files_archive(&staged))
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found(format!("Backup {name} contains no files archive"))
                    })?;
                scratch = Some(extracted);
                files
            }
            _ => path,
        };

        if tokio::fs::try_exists(&self.upload_root).await? {
            tokio::fs::remove_dir_all(&self.upload_root).await?;
        }

        let target = self.extraction_target(&source).await?;
        tokio::fs::create_dir_all(&target).await?;
        let report = {
            let source = source.clone();
            let target = target.clone();
            archive::run_blocking(move || archive::extract_tree_archive(&source, &target)).await?
        };
        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.len(), "Unsafe or unreadable entries skipped");
        }

        if let Some(scratch) = scratch {
            let _ = scratch.close().await;
        }

        info!(
            backup = %name,
            rollback = %rollback_name,
            files = report.files,
            directories = report.directories,
            "Files restored"
        );
        Ok(RestoreOutcome {
            message: format!(
                "Restored {} files and {} directories from {name}",
                report.files, report.directories
            ),
            restored_from: name.to_string(),
            rollback_artifact: rollback_name,
            skipped_entries: report.skipped,
        })
    }

    /// Resolve, check existence, then check the kind, in that order.
    async fn locate(
        &self,
        name: &str,
        accepted: &[BackupKind],
    ) -> AppResult<(PathBuf, BackupKind)> {
        let path = resolve_within(&self.backup_root, name)?;
        if !is_file(&path).await {
            return Err(AppError::not_found(format!("Backup {name} not found")));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = BackupKind::from_file_name(&file_name);
        if !accepted.contains(&kind) {
            let expected: Vec<&str> = accepted.iter().map(BackupKind::as_str).collect();
            return Err(AppError::conflict(format!(
                "Backup {name} is a {kind} backup; expected {}",
                expected.join(" or ")
            )));
        }
        Ok((path, kind))
    }

    /// Unpack a full backup into a fresh scratch directory.
    async fn extract_full(&self, path: &Path, ts: &str) -> AppResult<ScratchDir> {
        let scratch =
            ScratchDir::create(self.backup_root.join(naming::RESTORE_STAGING_DIR).join(ts))
                .await?;
        let source = path.to_path_buf();
        let dest = scratch.path().to_path_buf();
        archive::run_blocking(move || archive::extract_tree_archive(&source, &dest)).await?;
        Ok(scratch)
    }

    /// Archive the current tree, or write the placeholder when there is
    /// no tree.
    async fn snapshot_tree(&self, dest: &Path) -> AppResult<()> {
        let root = self.upload_root.clone();
        let dest = dest.to_path_buf();
        if is_dir(&root).await {
            archive::run_blocking(move || archive::build_tree_archive(&root, &dest).map(|_| ()))
                .await
        } else {
            archive::run_blocking(move || archive::build_empty_archive(&dest)).await
        }
    }

    /// Where to unpack a files archive.
    ///
    /// Archives whose entries all sit under the root's own directory name
    /// unpack over the root's parent; archives relative to the root unpack
    /// into it.
    async fn extraction_target(&self, source: &Path) -> AppResult<PathBuf> {
        let Some(root_name) = self
            .upload_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
        else {
            return Ok(self.upload_root.clone());
        };

        let archive_path = source.to_path_buf();
        let prefixed = {
            let root_name = root_name.clone();
            archive::run_blocking(move || archive::all_entries_under(&archive_path, &root_name))
                .await?
        };
        if !prefixed {
            return Ok(self.upload_root.clone());
        }

        Ok(match self.upload_root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        })
    }
}

/// A failed rollback point aborts the restore with the original kind.
fn rollback_failed(err: AppError, what: &str) -> AppError {
    error!(error = %err, "Failed to create {what} rollback point; restore aborted");
    let kind = match err.kind {
        ErrorKind::ExternalTool => ErrorKind::ExternalTool,
        _ => ErrorKind::Storage,
    };
    AppError::new(
        kind,
        format!(
            "Failed to create {what} rollback point, restore aborted: {}",
            err.message
        ),
    )
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Records restores; fails dumps on request.
    #[derive(Debug, Default)]
    struct RecordingDumper {
        fail_dump: bool,
        restored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DatabaseDumper for RecordingDumper {
        async fn dump(&self, dest: &Path) -> AppResult<()> {
            if self.fail_dump {
                return Err(AppError::external_tool("pg_dump: connection refused"));
            }
            tokio::fs::write(dest, b"-- current\n").await?;
            Ok(())
        }

        async fn restore(&self, src: &Path) -> AppResult<()> {
            let body = tokio::fs::read_to_string(src).await?;
            self.restored.lock().unwrap().push(body);
            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        dumper: Arc<RecordingDumper>,
        restore: RestoreManager,
    }

    impl Fixture {
        fn new(fail_dump: bool) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("backups")).unwrap();
            let dumper = Arc::new(RecordingDumper {
                fail_dump,
                ..Default::default()
            });
            let restore = RestoreManager::new(
                dumper.clone(),
                dir.path().join("uploads"),
                dir.path().join("backups"),
            );
            Self {
                dir,
                dumper,
                restore,
            }
        }

        fn uploads(&self) -> PathBuf {
            self.dir.path().join("uploads")
        }

        fn backups(&self) -> PathBuf {
            self.dir.path().join("backups")
        }
    }

    fn files_backup(fx: &Fixture, name: &str, files: &[(&str, &str)]) {
        let src = fx.dir.path().join("src");
        for (rel, body) in files {
            let path = src.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        archive::build_tree_archive(&src, &fx.backups().join(name)).unwrap();
        fs::remove_dir_all(src).unwrap();
    }

    #[tokio::test]
    async fn test_traversal_is_rejected_before_any_side_effect() {
        let fx = Fixture::new(false);
        let err = fx.restore.restore_database("../../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
        let err = fx.restore.restore_files("../../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
        assert_eq!(fs::read_dir(fx.backups()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_and_wrong_kind() {
        let fx = Fixture::new(false);
        let err = fx
            .restore
            .restore_database("database_backup_20240101_000000.sql")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        fs::write(fx.backups().join("files_backup_20240101_000000.zip"), b"x").unwrap();
        let err = fx
            .restore
            .restore_database("files_backup_20240101_000000.zip")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(fs::read_dir(fx.backups()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_restore_database_creates_rollback_first() {
        let fx = Fixture::new(false);
        let name = "database_backup_20240101_000000.sql";
        fs::write(fx.backups().join(name), b"-- old\n").unwrap();

        let outcome = fx.restore.restore_database(name).await.unwrap();
        assert!(outcome.rollback_artifact.starts_with("rollback_before_restore_"));
        assert!(fx.backups().join(&outcome.rollback_artifact).is_file());
        assert_eq!(*fx.dumper.restored.lock().unwrap(), vec!["-- old\n".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_rollback_point_aborts_restore() {
        let fx = Fixture::new(true);
        let name = "database_backup_20240101_000000.sql";
        fs::write(fx.backups().join(name), b"-- old\n").unwrap();

        let err = fx.restore.restore_database(name).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalTool);
        assert!(fx.dumper.restored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_database_from_full_backup() {
        let fx = Fixture::new(false);
        let staging = fx.dir.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("database_20240101_000000.sql"), b"-- full\n").unwrap();
        let name = "full_backup_20240101_000000.zip";
        archive::build_composite_archive(&staging, &fx.backups().join(name)).unwrap();

        fx.restore.restore_database(name).await.unwrap();
        assert_eq!(*fx.dumper.restored.lock().unwrap(), vec!["-- full\n".to_string()]);
        assert_eq!(
            fs::read_dir(fx.backups().join("temp_restore")).unwrap().count(),
            0
        );
    }

    #[tokio::test]
    async fn test_restore_files_replaces_tree() {
        let fx = Fixture::new(false);
        let name = "files_backup_20240101_000000.zip";
        files_backup(&fx, name, &[("QC25/LineA/a.nc", "restored")]);
        fs::create_dir_all(fx.uploads()).unwrap();
        fs::write(fx.uploads().join("stale.nc"), b"stale").unwrap();

        let outcome = fx.restore.restore_files(name).await.unwrap();

        assert_eq!(
            fs::read_to_string(fx.uploads().join("QC25/LineA/a.nc")).unwrap(),
            "restored"
        );
        assert!(!fx.uploads().join("stale.nc").exists());

        // The rollback point holds the tree as it was.
        let rollback = fx.backups().join(&outcome.rollback_artifact);
        let mut zip = zip::ZipArchive::new(fs::File::open(rollback).unwrap()).unwrap();
        assert!(zip.by_name("stale.nc").is_ok());
    }

    #[tokio::test]
    async fn test_restore_placeholder_over_absent_root() {
        let fx = Fixture::new(false);
        let name = "files_backup_20240101_000000.zip";
        archive::build_empty_archive(&fx.backups().join(name)).unwrap();

        let outcome = fx.restore.restore_files(name).await.unwrap();
        assert!(fx.uploads().is_dir());
        assert_eq!(fs::read_dir(fx.uploads()).unwrap().count(), 0);
        assert!(fx.backups().join(outcome.rollback_artifact).is_file());
    }

    #[tokio::test]
    async fn test_full_backup_without_files_archive_is_not_found() {
        let fx = Fixture::new(false);
        let staging = fx.dir.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("database_20240101_000000.sql"), b"--").unwrap();
        let name = "full_backup_20240101_000000.zip";
        archive::build_composite_archive(&staging, &fx.backups().join(name)).unwrap();

        fs::create_dir_all(fx.uploads()).unwrap();
        fs::write(fx.uploads().join("keep.nc"), b"keep").unwrap();
        let err = fx.restore.restore_files(name).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(fx.uploads().join("keep.nc").is_file());
    }
}
