//! Storage directory configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Locations of the program-file tree and the backup medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the canonical program-file hierarchy.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
    /// Directory holding backup artifacts, rollback points and
    /// per-run migration backups.
    #[serde(default = "default_backup_root")]
    pub backup_root: String,
    /// Maximum accepted size of a single uploaded file (default 500 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl StorageConfig {
    /// Upload root as a path.
    pub fn upload_root_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_root)
    }

    /// Backup root as a path.
    pub fn backup_root_path(&self) -> PathBuf {
        PathBuf::from(&self.backup_root)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
            backup_root: default_backup_root(),
            max_upload_size_bytes: default_max_upload(),
        }
    }
}

fn default_upload_root() -> String {
    "./uploads".to_string()
}

fn default_backup_root() -> String {
    "./backups".to_string()
}

fn default_max_upload() -> u64 {
    524_288_000 // 500 MB
}
