//! Scratch directories removed on every exit path.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use progstore_core::result::AppResult;

/// A directory that is deleted when the guard goes out of scope.
///
/// [`close`](Self::close) removes it eagerly and reports the outcome;
/// otherwise `Drop` removes it and logs a failure.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    armed: bool,
}

impl ScratchDir {
    /// Create `path` (and its parents).
    pub async fn create(path: PathBuf) -> AppResult<Self> {
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Scratch directory created");
        Ok(Self { path, armed: true })
    }

    /// The directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now.
    pub async fn close(mut self) -> AppResult<()> {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory");
                Err(e.into())
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp/20240101_120000");
        {
            let scratch = ScratchDir::create(path.clone()).await.unwrap();
            std::fs::write(scratch.path().join("x.sql"), b"x").unwrap();
            assert!(path.is_dir());
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_with_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch");
        let scratch = ScratchDir::create(path.clone()).await.unwrap();
        std::fs::remove_dir_all(&path).unwrap();
        scratch.close().await.unwrap();
    }
}
