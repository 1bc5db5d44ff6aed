//! Full-backup composite archives and the empty placeholder archive.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;

use super::{create_writer, entry_options};

/// Canonical name of the database dump inside a composite archive.
pub const DATABASE_ENTRY: &str = "database.sql";
/// Canonical name of the files archive inside a composite archive.
pub const FILES_ENTRY: &str = "files.zip";
/// Name of the plain-text manifest inside a composite archive.
pub const MANIFEST_ENTRY: &str = "backup_info.txt";
/// Single entry of the placeholder archive.
pub const EMPTY_MARKER: &str = "uploads/";

/// What a composite archive ended up containing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeContents {
    /// Whether `files.zip` was included.
    pub has_files_archive: bool,
}

/// Write a placeholder archive holding only the `uploads/` marker.
pub fn build_empty_archive(dest: &Path) -> AppResult<()> {
    let mut writer = create_writer(dest)?;
    writer.add_directory(EMPTY_MARKER, entry_options().unix_permissions(0o755))?;
    writer.finish()?;
    Ok(())
}

/// Bundle a staged database dump, an optional files archive and a
/// manifest into `dest`.
///
/// The staging directory is searched for `database_*.sql` (falling back to
/// `database.sql`) and `files_*.zip` (falling back to `files.zip`), so an
/// extracted composite can be re-bundled as is. Fails with `NotFound` when
/// no dump is staged.
pub fn build_composite_archive(staging_dir: &Path, dest: &Path) -> AppResult<CompositeContents> {
    let database = find_database_dump(staging_dir)?.ok_or_else(|| {
        AppError::not_found(format!(
            "No database dump staged in {}",
            staging_dir.display()
        ))
    })?;
    let files = find_files_archive(staging_dir)?;

    let mut writer = create_writer(dest)?;

    writer.start_file(DATABASE_ENTRY, entry_options())?;
    io::copy(&mut BufReader::new(File::open(&database)?), &mut writer)?;

    if let Some(files) = &files {
        writer.start_file(FILES_ENTRY, entry_options())?;
        io::copy(&mut BufReader::new(File::open(files)?), &mut writer)?;
    }

    let created_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    writer.start_file(MANIFEST_ENTRY, entry_options())?;
    writer.write_all(manifest_text(&created_at).as_bytes())?;
    writer.finish()?;

    debug!(
        staging = %staging_dir.display(),
        dest = %dest.display(),
        has_files_archive = files.is_some(),
        "Composite archive written"
    );
    Ok(CompositeContents {
        has_files_archive: files.is_some(),
    })
}

/// Manifest describing a full-system backup.
pub fn manifest_text(created_at: &str) -> String {
    format!(
        "Backup Type: Full System Backup\n\
         Created At: {created_at}\n\
         System: {}/{}\n\
         Runtime Version: {} {}\n",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    )
}

/// Locate the staged database dump in `dir`.
pub fn find_database_dump(dir: &Path) -> AppResult<Option<PathBuf>> {
    find_staged(dir, "database_", ".sql", DATABASE_ENTRY)
}

/// Locate the staged files archive in `dir`.
pub fn find_files_archive(dir: &Path) -> AppResult<Option<PathBuf>> {
    find_staged(dir, "files_", ".zip", FILES_ENTRY)
}

/// First regular file (by name) matching `<prefix>*<suffix>`, else
/// `fallback` if it exists.
fn find_staged(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    fallback: &str,
) -> AppResult<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    if let Some(first) = candidates.into_iter().next() {
        return Ok(Some(first));
    }
    let fallback = dir.join(fallback);
    Ok(fallback.is_file().then_some(fallback))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use zip::ZipArchive;

    use progstore_core::error::ErrorKind;

    use super::*;
    use crate::archive::tree::{build_tree_archive, extract_tree_archive};

    fn entry_set(archive: &Path) -> BTreeSet<String> {
        let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_empty_archive_has_single_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("empty.zip");
        build_empty_archive(&dest).unwrap();
        assert_eq!(entry_set(&dest), BTreeSet::from([EMPTY_MARKER.to_string()]));
    }

    #[test]
    fn test_composite_without_files_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("database_20240101_120000.sql"), b"-- dump").unwrap();

        let dest = tmp.path().join("full_backup_20240101_120000.zip");
        let contents = build_composite_archive(&staging, &dest).unwrap();

        assert!(!contents.has_files_archive);
        assert_eq!(
            entry_set(&dest),
            BTreeSet::from([DATABASE_ENTRY.to_string(), MANIFEST_ENTRY.to_string()])
        );
    }

    #[test]
    fn test_composite_renames_entries_and_is_rebuildable() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        let tree = tmp.path().join("tree");
        fs::create_dir_all(&staging).unwrap();
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("a.txt"), b"a").unwrap();
        fs::write(staging.join("database_20240101_120000.sql"), b"-- dump").unwrap();
        build_tree_archive(&tree, &staging.join("files_20240101_120000.zip")).unwrap();

        let first = tmp.path().join("first.zip");
        build_composite_archive(&staging, &first).unwrap();
        let expected = BTreeSet::from([
            DATABASE_ENTRY.to_string(),
            FILES_ENTRY.to_string(),
            MANIFEST_ENTRY.to_string(),
        ]);
        assert_eq!(entry_set(&first), expected);

        let extracted = tmp.path().join("extracted");
        extract_tree_archive(&first, &extracted).unwrap();
        assert_eq!(fs::read(extracted.join(DATABASE_ENTRY)).unwrap(), b"-- dump");

        let second = tmp.path().join("second.zip");
        build_composite_archive(&extracted, &second).unwrap();
        assert_eq!(entry_set(&second), expected);
    }

    #[test]
    fn test_composite_requires_database_dump() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("files_1.zip"), b"zip").unwrap();
        let err = build_composite_archive(tmp.path(), &tmp.path().join("out.zip")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_find_staged_prefers_pattern_over_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("database.sql"), b"fallback").unwrap();
        assert_eq!(
            find_database_dump(tmp.path()).unwrap(),
            Some(tmp.path().join("database.sql"))
        );
        fs::write(tmp.path().join("database_2.sql"), b"pattern").unwrap();
        assert_eq!(
            find_database_dump(tmp.path()).unwrap(),
            Some(tmp.path().join("database_2.sql"))
        );
        assert_eq!(find_files_archive(tmp.path()).unwrap(), None);
    }

    #[test]
    fn test_manifest_mentions_type_and_system() {
        let text = manifest_text("2024-01-01 12:00:00");
        assert!(text.starts_with("Backup Type: Full System Backup\n"));
        assert!(text.contains("Created At: 2024-01-01 12:00:00\n"));
        assert!(text.contains(std::env::consts::OS));
    }
}
