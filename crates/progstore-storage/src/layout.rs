//! Canonical program directory scheme.
//!
//! `root / vehicle / line / <code>_<name> / version / file`, every segment
//! except the program code and the file name passed through [`sanitize`].

use std::path::{Component, Path, PathBuf};

use crate::sanitize::sanitize;

/// Metadata that locates a program version on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCoordinates<'a> {
    /// Vehicle model name.
    pub vehicle_model: &'a str,
    /// Production line name.
    pub production_line: &'a str,
    /// Program code, used verbatim.
    pub program_code: &'a str,
    /// Program name.
    pub program_name: &'a str,
    /// Version label.
    pub version: &'a str,
}

impl ProgramCoordinates<'_> {
    /// Directory of this program version relative to the storage root.
    pub fn relative_directory(&self) -> PathBuf {
        let mut dir = PathBuf::from(sanitize(self.vehicle_model));
        dir.push(sanitize(self.production_line));
        dir.push(format!(
            "{}_{}",
            self.program_code,
            sanitize(self.program_name)
        ));
        dir.push(sanitize(self.version));
        dir
    }

    /// Directory of this program version under `root`.
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(self.relative_directory())
    }

    /// Location of `file_name` inside this program version under `root`.
    ///
    /// The file name is not sanitized; callers validate it on upload.
    pub fn file_path(&self, root: &Path, file_name: &str) -> PathBuf {
        self.directory(root).join(file_name)
    }
}

/// Canonical directory for a program version.
pub fn program_directory(
    root: &Path,
    vehicle_model: &str,
    production_line: &str,
    program_code: &str,
    program_name: &str,
    version: &str,
) -> PathBuf {
    ProgramCoordinates {
        vehicle_model,
        production_line,
        program_code,
        program_name,
        version,
    }
    .directory(root)
}

/// Whether a stored relative path already sits in the canonical hierarchy.
///
/// A path whose parent is empty, `.`, or the filesystem root is still in
/// the legacy flat layout.
pub fn is_already_migrated(stored_path: &str) -> bool {
    let path = Path::new(stored_path);
    let Some(parent) = path.parent() else {
        return false;
    };
    parent
        .components()
        .any(|c| matches!(c, Component::Normal(_)))
}
