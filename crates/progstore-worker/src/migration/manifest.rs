//! Per-run record of backed-up files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use progstore_core::result::AppResult;
use progstore_core::types::MigrationRunId;

/// File name of the manifest inside a run directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One file copied into the run directory before it was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Stored file id.
    pub file_id: Uuid,
    /// Path relative to the storage root before the move.
    pub original_path: String,
    /// Name of the copy inside the run directory.
    pub backup_name: String,
    /// Path relative to the storage root after the move.
    pub new_path: String,
}

/// Everything a run backed up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationManifest {
    /// The run that wrote the manifest.
    pub run_id: Option<MigrationRunId>,
    /// Backed-up files in processing order.
    pub entries: Vec<ManifestEntry>,
}

impl MigrationManifest {
    /// Empty manifest of a run.
    pub fn new(run_id: MigrationRunId) -> Self {
        Self {
            run_id: Some(run_id),
            entries: Vec::new(),
        }
    }

    /// Whether a backup copy named `name` is already taken.
    pub fn has_backup_name(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.backup_name == name)
    }

    /// Read the manifest of `run_dir`, `None` when there is none.
    pub async fn load(run_dir: &Path) -> AppResult<Option<Self>> {
        let path = run_dir.join(MANIFEST_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the manifest into `run_dir`, replacing the previous one.
    pub async fn save(&self, run_dir: &Path) -> AppResult<()> {
        let tmp = run_dir.join(format!("{MANIFEST_FILE}.tmp"));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp, run_dir.join(MANIFEST_FILE)).await?;
        Ok(())
    }
}
