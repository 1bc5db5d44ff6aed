//! Zip archive codec.
//!
//! Directory entries are names ending in `/`; file entries are
//! deflate-compressed. Names are always `/`-separated and relative.

pub mod bundle;
pub mod composite;
pub mod tree;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;

pub use bundle::{BundleEntry, build_bundle_archive};
pub use composite::{
    CompositeContents, build_composite_archive, build_empty_archive, find_database_dump,
    find_files_archive,
};
pub use tree::{ExtractReport, all_entries_under, build_tree_archive, extract_tree_archive};

/// Counts of what went into an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Directory entries written.
    pub directories: usize,
    /// File entries written.
    pub files: usize,
    /// Uncompressed bytes written.
    pub bytes: u64,
}

/// Run a synchronous archive task on the blocking thread pool.
pub async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::internal(format!("Archive task failed: {e}")))?
}

/// Default options for every entry.
pub(crate) fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Create `dest` (and its parent) and wrap it in a zip writer.
pub(crate) fn create_writer(dest: &Path) -> AppResult<ZipWriter<BufWriter<File>>> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(dest).map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to create archive {}", dest.display()),
            e,
        )
    })?;
    Ok(ZipWriter::new(BufWriter::new(file)))
}
