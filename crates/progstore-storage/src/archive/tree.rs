//! Directory tree archives.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;

use super::{ArchiveSummary, create_writer, entry_options};
use crate::paths::safe_relative;

/// File-type bits of a unix mode.
const S_IFMT: u32 = 0o170000;
/// Symbolic link file type.
const S_IFLNK: u32 = 0o120000;

/// Outcome of an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Directory entries created.
    pub directories: usize,
    /// File entries written.
    pub files: usize,
    /// Names of entries that were unsafe or unreadable.
    pub skipped: Vec<String>,
}

/// Archive everything under `source_dir` into `dest`.
///
/// Every directory gets its own `name/` entry so empty directories
/// survive. Symbolic links are not followed and not archived. A partial
/// archive is left behind on failure.
pub fn build_tree_archive(source_dir: &Path, dest: &Path) -> AppResult<ArchiveSummary> {
    let mut writer = create_writer(dest)?;
    let mut summary = ArchiveSummary::default();

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to walk {}", source_dir.display()),
                e,
            )
        })?;
        if entry.path() == dest {
            continue;
        }

        let relative = entry.path().strip_prefix(source_dir).map_err(|_| {
            AppError::internal(format!(
                "{} is not under {}",
                entry.path().display(),
                source_dir.display()
            ))
        })?;
        let name = archive_name(relative);
        let options = options_for(&entry);

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
            summary.directories += 1;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let mut input = BufReader::new(File::open(entry.path())?);
            summary.bytes += io::copy(&mut input, &mut writer)?;
            summary.files += 1;
        }
    }

    writer.finish()?;
    debug!(
        source = %source_dir.display(),
        dest = %dest.display(),
        files = summary.files,
        directories = summary.directories,
        "Tree archive written"
    );
    Ok(summary)
}

/// Extract `archive_path` into `dest_dir`.
///
/// Entries that are absolute, contain `..`, are symbolic links, or would
/// be written through an existing symbolic link are skipped, as are
/// entries that cannot be read. Directories receive their stored
/// permission bits once all entries are written; files overwrite whatever
/// exists at their path.
pub fn extract_tree_archive(archive_path: &Path, dest_dir: &Path) -> AppResult<ExtractReport> {
    let file = File::open(archive_path).map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to open archive {}", archive_path.display()),
            e,
        )
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(dest_dir)?;

    let mut report = ExtractReport::default();
    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable archive entry");
                report.skipped.push(format!("#{index}"));
                continue;
            }
        };
        let name = entry.name().to_string();

        let Some(relative) = safe_relative(&name) else {
            warn!(entry = %name, "Skipping archive entry outside destination");
            report.skipped.push(name);
            continue;
        };
        if entry.unix_mode().is_some_and(|m| m & S_IFMT == S_IFLNK)
            || crosses_symlink(dest_dir, &relative)
        {
            warn!(entry = %name, "Skipping archive entry involving a symbolic link");
            report.skipped.push(name);
            continue;
        }

        let target = dest_dir.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            if let Some(mode) = entry.unix_mode() {
                dir_modes.push((target, mode));
            }
            report.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&target)?;
        if let Err(e) = io::copy(&mut entry, &mut output) {
            warn!(entry = %name, error = %e, "Skipping unreadable archive entry");
            drop(output);
            if let Err(e) = fs::remove_file(&target) {
                warn!(path = %target.display(), error = %e, "Failed to remove partial file");
            }
            report.skipped.push(name);
            continue;
        }
        report.files += 1;
    }

    apply_dir_modes(dir_modes);
    debug!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        files = report.files,
        skipped = report.skipped.len(),
        "Archive extracted"
    );
    Ok(report)
}

/// Whether every entry of the archive lives under `dir_name/`.
///
/// Distinguishes archives that carry the storage root's own directory
/// name (such as the `uploads/` placeholder) from archives whose entries
/// are relative to the root.
pub fn all_entries_under(archive_path: &Path, dir_name: &str) -> AppResult<bool> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(archive_path)?))?;
    if archive.is_empty() {
        return Ok(false);
    }
    let prefix = format!("{dir_name}/");
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.name().starts_with(&prefix) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `/`-joined entry name of a relative path.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn options_for(entry: &walkdir::DirEntry) -> SimpleFileOptions {
    let options = entry_options();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = entry.metadata() {
            return options.unix_permissions(metadata.permissions().mode() & 0o7777);
        }
    }
    options
}

/// Whether any existing prefix of `dest/relative` is a symbolic link.
fn crosses_symlink(dest: &Path, relative: &Path) -> bool {
    let mut current = dest.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

#[cfg(unix)]
fn apply_dir_modes(mut dir_modes: Vec<(PathBuf, u32)>) {
    use std::os::unix::fs::PermissionsExt;

    // Deepest first, so a read-only parent is applied after its children.
    dir_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (path, mode) in dir_modes {
        let permissions = fs::Permissions::from_mode(mode & 0o7777);
        if let Err(e) = fs::set_permissions(&path, permissions) {
            warn!(path = %path.display(), error = %e, "Failed to apply directory permissions");
        }
    }
}

#[cfg(not(unix))]
fn apply_dir_modes(_dir_modes: Vec<(PathBuf, u32)>) {}
