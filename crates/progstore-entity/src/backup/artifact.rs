//! Backup artifact descriptions, reconstructed from the backup directory.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// File name prefix of database-only backups.
pub const DATABASE_PREFIX: &str = "database_backup_";
/// File name prefix of file-tree backups.
pub const FILES_PREFIX: &str = "files_backup_";
/// File name prefix of full-system backups.
pub const FULL_PREFIX: &str = "full_backup_";

/// Kind of a backup artifact, derived from its file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// `database_backup_*`
    Database,
    /// `files_backup_*`
    Files,
    /// `full_backup_*`
    Full,
    /// Anything else found in the backup directory.
    Unknown,
}

impl BackupKind {
    /// Classify a backup by its file name.
    pub fn from_file_name(name: &str) -> Self {
        if name.starts_with(DATABASE_PREFIX) {
            Self::Database
        } else if name.starts_with(FILES_PREFIX) {
            Self::Files
        } else if name.starts_with(FULL_PREFIX) {
            Self::Full
        } else {
            Self::Unknown
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Files => "files",
            Self::Full => "full",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named file on the backup medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArtifact {
    /// File name within the backup root.
    pub name: String,
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Creation (modification) time.
    pub created_at: DateTime<Utc>,
    /// Kind derived from the name prefix.
    pub kind: BackupKind,
}

impl BackupArtifact {
    /// Build an artifact description, classifying it by name.
    pub fn new(
        name: impl Into<String>,
        path: PathBuf,
        size_bytes: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let kind = BackupKind::from_file_name(&name);
        Self {
            name,
            path,
            size_bytes,
            created_at,
            kind,
        }
    }

    /// Fixed-width RFC 3339 creation timestamp; sorts lexicographically in
    /// chronological order.
    pub fn created_at_label(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_prefix() {
        assert_eq!(
            BackupKind::from_file_name("database_backup_20240101_120000.sql"),
            BackupKind::Database
        );
        assert_eq!(
            BackupKind::from_file_name("files_backup_20240101_120000.zip"),
            BackupKind::Files
        );
        assert_eq!(
            BackupKind::from_file_name("full_backup_20240101_120000.zip"),
            BackupKind::Full
        );
        assert_eq!(
            BackupKind::from_file_name("rollback_before_restore_20240101_120000.sql"),
            BackupKind::Unknown
        );
    }

    #[test]
    fn test_created_at_label_is_fixed_width() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let artifact = BackupArtifact::new("x.zip", PathBuf::from("/b/x.zip"), 1, ts);
        assert_eq!(artifact.created_at_label(), "2024-03-05T07:08:09Z");
    }
}
