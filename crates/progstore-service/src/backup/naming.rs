//! File name conventions of the backup medium.
//!
//! The prefixes are load-bearing: listing classifies by them and restore
//! validates against them.

use chrono::Local;

pub use progstore_entity::backup::artifact::{DATABASE_PREFIX, FILES_PREFIX, FULL_PREFIX};

/// Prefix of the database rollback point taken before a restore.
pub const ROLLBACK_DATABASE_PREFIX: &str = "rollback_before_restore_";
/// Prefix of the file-tree rollback point taken before a restore.
pub const ROLLBACK_FILES_PREFIX: &str = "rollback_files_before_restore_";
/// Prefix of the tree archive written before a layout migration.
pub const PRE_MIGRATION_PREFIX: &str = "pre_migration_backup_";

/// Scratch area for full-backup staging.
pub const STAGING_DIR: &str = "temp";
/// Scratch area for full-backup extraction during restore.
pub const RESTORE_STAGING_DIR: &str = "temp_restore";
/// Parent of per-run migration backup directories.
pub const MIGRATION_DIR: &str = "file_migration";

/// Local wall-clock timestamp, `YYYYMMDD_HHMMSS`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `database_backup_<ts>.sql`
pub fn database_backup_name(ts: &str) -> String {
    format!("{DATABASE_PREFIX}{ts}.sql")
}

/// `files_backup_<ts>.zip`
pub fn files_backup_name(ts: &str) -> String {
    format!("{FILES_PREFIX}{ts}.zip")
}

/// `full_backup_<ts>.zip`
pub fn full_backup_name(ts: &str) -> String {
    format!("{FULL_PREFIX}{ts}.zip")
}

/// `rollback_before_restore_<ts>.sql`
pub fn rollback_database_name(ts: &str) -> String {
    format!("{ROLLBACK_DATABASE_PREFIX}{ts}.sql")
}

/// `rollback_files_before_restore_<ts>.zip`
pub fn rollback_files_name(ts: &str) -> String {
    format!("{ROLLBACK_FILES_PREFIX}{ts}.zip")
}

/// `pre_migration_backup_<ts>.zip`
pub fn pre_migration_name(ts: &str) -> String {
    format!("{PRE_MIGRATION_PREFIX}{ts}.zip")
}

/// Dump staged inside a full backup: `database_<ts>.sql`.
pub fn staged_dump_name(ts: &str) -> String {
    format!("database_{ts}.sql")
}

/// Tree archive staged inside a full backup: `files_<ts>.zip`.
pub fn staged_files_name(ts: &str) -> String {
    format!("files_{ts}.zip")
}

#[cfg(test)]
mod tests {
    use progstore_entity::backup::BackupKind;

    use super::*;

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_names_classify_by_prefix() {
        let ts = "20240101_120000";
        assert_eq!(
            BackupKind::from_file_name(&database_backup_name(ts)),
            BackupKind::Database
        );
        assert_eq!(BackupKind::from_file_name(&files_backup_name(ts)), BackupKind::Files);
        assert_eq!(BackupKind::from_file_name(&full_backup_name(ts)), BackupKind::Full);
        assert_eq!(
            BackupKind::from_file_name(&rollback_files_name(ts)),
            BackupKind::Unknown
        );
        assert_eq!(rollback_database_name(ts), "rollback_before_restore_20240101_120000.sql");
    }
}
