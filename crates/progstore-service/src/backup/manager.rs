//! Creation, listing, deletion and download of backup artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_core::traits::DatabaseDumper;
use progstore_entity::backup::BackupArtifact;
use progstore_storage::archive;
use progstore_storage::filesystem::{contains_files, is_dir, is_file};
use progstore_storage::paths::resolve_within;

use super::naming;
use super::scratch::ScratchDir;

/// Produces backup artifacts under the backup root.
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Database dump collaborator.
    dumper: Arc<dyn DatabaseDumper>,
    /// Root of the program-file tree.
    upload_root: PathBuf,
    /// Directory holding the artifacts.
    backup_root: PathBuf,
}

impl BackupManager {
    /// Creates a new backup manager.
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

    /// The backup directory.
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Dump the database to `database_backup_<ts>.sql`.
    #[instrument(skip(self))]
    pub async fn create_database_backup(&self) -> AppResult<BackupArtifact> {
        tokio::fs::create_dir_all(&self.backup_root).await?;
        let dest = self
            .backup_root
            .join(naming::database_backup_name(&naming::timestamp()));

        if let Err(e) = self.dumper.dump(&dest).await {
            discard_partial(&dest).await;
            return Err(e);
        }

        let artifact = describe(&dest).await?;
        info!(name = %artifact.name, size = artifact.size_bytes, "Database backup created");
        Ok(artifact)
    }

    /// Archive the program-file tree to `files_backup_<ts>.zip`.
    #[instrument(skip(self))]
    pub async fn create_files_backup(&self) -> AppResult<BackupArtifact> {
        if !is_dir(&self.upload_root).await {
            return Err(AppError::not_found(format!(
                "Storage root {} does not exist",
                self.upload_root.display()
            )));
        }
        tokio::fs::create_dir_all(&self.backup_root).await?;
        let dest = self
            .backup_root
            .join(naming::files_backup_name(&naming::timestamp()));

        let source = self.upload_root.clone();
        let target = dest.clone();
        let built =
            archive::run_blocking(move || archive::build_tree_archive(&source, &target)).await;
        let summary = match built {
            Ok(summary) => summary,
            Err(e) => {
                discard_partial(&dest).await;
                return Err(e);
            }
        };

        let artifact = describe(&dest).await?;
        info!(
            name = %artifact.name,
            files = summary.files,
            directories = summary.directories,
            "Files backup created"
        );
        Ok(artifact)
    }

    /// Bundle a database dump and a files archive into
    /// `full_backup_<ts>.zip`.
    ///
    /// A missing storage root is staged as the empty placeholder archive;
    /// a root without files stages no files archive at all.
    #[instrument(skip(self))]
    pub async fn create_full_backup(&self) -> AppResult<BackupArtifact> {
        let ts = naming::timestamp();
        let staging_dir = self.backup_root.join(naming::STAGING_DIR).join(&ts);
        let scratch = ScratchDir::create(staging_dir).await?;

        self.dumper
            .dump(&scratch.path().join(naming::staged_dump_name(&ts)))
            .await?;

        let staged = scratch.path().join(naming::staged_files_name(&ts));
        if is_dir(&self.upload_root).await {
            let root = self.upload_root.clone();
            if archive::run_blocking(move || Ok(contains_files(&root))).await? {
                let source = self.upload_root.clone();
                archive::run_blocking(move || archive::build_tree_archive(&source, &staged))
                    .await?;
            }
        } else {
            archive::run_blocking(move || archive::build_empty_archive(&staged)).await?;
        }

        let dest = self.backup_root.join(naming::full_backup_name(&ts));
        let staging = scratch.path().to_path_buf();
        let target = dest.clone();
        let built =
            archive::run_blocking(move || archive::build_composite_archive(&staging, &target))
                .await;
        let contents = match built {
            Ok(contents) => contents,
            Err(e) => {
                discard_partial(&dest).await;
                return Err(e);
            }
        };

        // Failures are logged by `close`; the artifact is complete either way.
        let _ = scratch.close().await;

        let artifact = describe(&dest).await?;
        info!(
            name = %artifact.name,
            size = artifact.size_bytes,
            has_files_archive = contents.has_files_archive,
            "Full backup created"
        );
        Ok(artifact)
    }

    /// Artifacts directly under the backup root, newest first.
    ///
    /// The backup root is created when missing; subdirectories are skipped.
    pub async fn list_backups(&self) -> AppResult<Vec<BackupArtifact>> {
        tokio::fs::create_dir_all(&self.backup_root).await?;

        let mut artifacts = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.backup_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let created_at: DateTime<Utc> = metadata.modified()?.into();
            artifacts.push(BackupArtifact::new(
                entry.file_name().to_string_lossy().into_owned(),
                entry.path(),
                metadata.len(),
                created_at,
            ));
        }

        artifacts.sort_by(|a, b| {
            b.created_at_label()
                .cmp(&a.created_at_label())
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(artifacts)
    }

    /// Delete a named artifact.
    pub async fn delete_backup(&self, name: &str) -> AppResult<BackupArtifact> {
        let artifact = self.download_backup(name).await?;
        tokio::fs::remove_file(&artifact.path).await?;
        info!(name = %artifact.name, "Backup deleted");
        Ok(artifact)
    }

    /// Locate a named artifact for download.
    pub async fn download_backup(&self, name: &str) -> AppResult<BackupArtifact> {
        let path = self.resolve(name)?;
        if !is_file(&path).await {
            return Err(AppError::not_found(format!("Backup {name} not found")));
        }
        describe(&path).await
    }

    /// Resolve `name` strictly under the backup root, without touching
    /// the filesystem.
    pub(crate) fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        resolve_within(&self.backup_root, name)
    }
}

/// Describe an artifact on disk.
async fn describe(path: &Path) -> AppResult<BackupArtifact> {
    let metadata = tokio::fs::metadata(path).await?;
    let created_at: DateTime<Utc> = metadata.modified()?.into();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(BackupArtifact::new(
        name,
        path.to_path_buf(),
        metadata.len(),
        created_at,
    ))
}

/// Remove a partially written artifact after a failed build.
async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial backup");
        }
    }
}
