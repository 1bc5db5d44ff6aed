//! Async filesystem helpers shared by upload, backup and migration.

use std::io;
use std::path::Path;

use tokio::fs;
use tracing::debug;

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Rename `from` to `to`, creating the target's parent first.
///
/// Falls back to copy-then-delete when the rename crosses devices.
pub async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    ensure_parent(to).await?;
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                from = %from.display(),
                to = %to.display(),
                "Cross-device rename, falling back to copy"
            );
            fs::copy(from, to).await?;
            fs::remove_file(from).await
        }
        Err(e) => Err(e),
    }
}

/// Whether a rename failed only because source and target are on
/// different filesystems.
fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

/// Copy `from` to `to`, creating the target's parent first.
pub async fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    ensure_parent(to).await?;
    fs::copy(from, to).await
}

/// Whether `path` exists and is a directory.
pub async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

/// Whether `path` exists and is a regular file.
pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Whether the directory tree under `root` holds at least one regular file.
pub fn contains_files(root: &Path) -> bool {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .any(|entry| entry.file_type().is_file())
}
