//! Restoring files from a migration run's backups.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use progstore_core::result::AppResult;
use progstore_storage::filesystem::copy_file;
use progstore_storage::paths::resolve_within;

use super::manifest::{MANIFEST_FILE, MigrationManifest};

/// Outcome of a rollback.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackReport {
    /// Run directory the files came from.
    pub run_dir: PathBuf,
    /// Whether the run's manifest was used.
    pub from_manifest: bool,
    /// Storage-relative paths written.
    pub restored: Vec<String>,
    /// Files that could not be restored, with the reason.
    pub failed: Vec<String>,
}

/// The most recently modified run directory under `runs_root`.
pub(crate) async fn latest_run_dir(runs_root: &Path) -> AppResult<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(runs_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_dir() {
            continue;
        }
        let modified = metadata.modified()?;
        let path = entry.path();
        let newer = match &latest {
            None => true,
            Some((time, best)) => modified > *time || (modified == *time && path > *best),
        };
        if newer {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// Copy every backed-up file of `run_dir` back under `upload_root`.
///
/// With a manifest each copy returns to its original relative path;
/// without one, copies land directly under the root by name. Individual
/// failures are reported, not fatal.
pub(crate) async fn restore_run(run_dir: &Path, upload_root: &Path) -> AppResult<RollbackReport> {
    let mut report = RollbackReport {
        run_dir: run_dir.to_path_buf(),
        ..RollbackReport::default()
    };

    match MigrationManifest::load(run_dir).await? {
        Some(manifest) => {
            report.from_manifest = true;
            for entry in &manifest.entries {
                let outcome = match resolve_within(upload_root, &entry.original_path) {
                    Ok(dest) => copy_file(&run_dir.join(&entry.backup_name), &dest)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.message),
                };
                record(&mut report, &entry.original_path, outcome);
            }
        }
        None => {
            let mut entries = tokio::fs::read_dir(run_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(MANIFEST_FILE) {
                    continue;
                }
                let outcome = copy_file(&entry.path(), &upload_root.join(&name))
                    .await
                    .map_err(|e| e.to_string());
                record(&mut report, &name, outcome);
            }
        }
    }

    tracing::info!(
        "Rollback from {}: {} restored, {} failed",
        run_dir.display(),
        report.restored.len(),
        report.failed.len()
    );
    Ok(report)
}

fn record<T>(report: &mut RollbackReport, path: &str, outcome: Result<T, String>) {
    match outcome {
        Ok(_) => {
            tracing::debug!("Restored {}", path);
            report.restored.push(path.to_string());
        }
        Err(e) => {
            tracing::warn!("Failed to restore {}: {}", path, e);
            report.failed.push(format!("{path}: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use uuid::Uuid;

    use super::*;
    use crate::migration::manifest::ManifestEntry;

    #[tokio::test]
    async fn test_manifest_restores_original_paths() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run");
        let root = dir.path().join("uploads");
        fs::create_dir_all(&run).unwrap();
        fs::write(run.join("a.nc"), b"a").unwrap();

        let mut manifest = MigrationManifest::default();
        manifest.entries.push(ManifestEntry {
            file_id: Uuid::new_v4(),
            original_path: "old/nested/a.nc".into(),
            backup_name: "a.nc".into(),
            new_path: "QC25/LineA/P001_X/1.0/a.nc".into(),
        });
        manifest.entries.push(ManifestEntry {
            file_id: Uuid::new_v4(),
            original_path: "../outside.nc".into(),
            backup_name: "a.nc".into(),
            new_path: "x".into(),
        });
        manifest.save(&run).await.unwrap();

        let report = restore_run(&run, &root).await.unwrap();
        assert!(report.from_manifest);
        assert_eq!(report.restored, vec!["old/nested/a.nc".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(fs::read(root.join("old/nested/a.nc")).unwrap(), b"a");
        assert!(!dir.path().join("outside.nc").exists());
    }

    #[tokio::test]
    async fn test_flat_fallback_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run");
        let root = dir.path().join("uploads");
        fs::create_dir_all(run.join("sub")).unwrap();
        fs::write(run.join("a.nc"), b"a").unwrap();

        let report = restore_run(&run, &root).await.unwrap();
        assert!(!report.from_manifest);
        assert_eq!(report.restored, vec!["a.nc".to_string()]);
        assert!(root.join("a.nc").is_file());
    }

    #[tokio::test]
    async fn test_latest_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_run_dir(&dir.path().join("missing")).await.unwrap().is_none());

        fs::create_dir_all(dir.path().join("20240101_000000")).unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();
        let latest = latest_run_dir(dir.path()).await.unwrap().unwrap();
        assert_eq!(latest, dir.path().join("20240101_000000"));
    }
}
