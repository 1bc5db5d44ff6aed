//! Download bundles of one program version.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use progstore_core::result::AppResult;

use super::{ArchiveSummary, create_writer, entry_options};

/// One file to place in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Absolute path of the stored file.
    pub source: PathBuf,
    /// Entry name inside the bundle.
    pub name: String,
}

/// Zip `entries` into `dest`. Sources that cannot be opened are skipped.
pub fn build_bundle_archive(entries: &[BundleEntry], dest: &Path) -> AppResult<ArchiveSummary> {
    let mut writer = create_writer(dest)?;
    let mut summary = ArchiveSummary::default();

    for entry in entries {
        let input = match File::open(&entry.source) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %entry.source.display(), error = %e, "Skipping missing bundle file");
                continue;
            }
        };
        writer.start_file(entry.name.as_str(), entry_options())?;
        summary.bytes += io::copy(&mut BufReader::new(input), &mut writer)?;
        summary.files += 1;
    }

    writer.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use zip::ZipArchive;

    use super::*;

    #[test]
    fn test_bundle_skips_missing_sources() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.dxf"), b"aaa").unwrap();
        let entries = vec![
            BundleEntry {
                source: tmp.path().join("a.dxf"),
                name: "1_a.dxf".to_string(),
            },
            BundleEntry {
                source: tmp.path().join("gone.dxf"),
                name: "2_gone.dxf".to_string(),
            },
        ];

        let dest = tmp.path().join("P001_1.0.zip");
        let summary = build_bundle_archive(&entries, &dest).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.bytes, 3);

        let mut zip = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        assert_eq!(zip.by_index(0).unwrap().name(), "1_a.dxf");
    }
}
