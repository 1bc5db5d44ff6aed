//! Stored file access: download resolution, deletion, version bundles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_database::MetadataStore;
use progstore_entity::file::StoredFile;
use progstore_storage::archive::{self, ArchiveSummary, BundleEntry};
use progstore_storage::filesystem::is_file;
use progstore_storage::paths::resolve_within;

/// A stored file located on disk.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    /// The metadata row.
    pub file: StoredFile,
    /// Absolute location on disk.
    pub path: PathBuf,
}

/// A version bundle written to disk.
#[derive(Debug, Clone)]
pub struct VersionBundle {
    /// Path of the zip file.
    pub path: PathBuf,
    /// Version label bundled.
    pub version: String,
    /// What went into the archive.
    pub summary: ArchiveSummary,
}

/// Read and delete access to stored files.
#[derive(Debug, Clone)]
pub struct FileService {
    /// Metadata store.
    store: Arc<dyn MetadataStore>,
    /// Root of the program-file tree.
    upload_root: PathBuf,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(store: Arc<dyn MetadataStore>, upload_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            upload_root: upload_root.into(),
        }
    }

    /// Locate a stored file for download.
    pub async fn resolve_download(&self, file_id: Uuid) -> AppResult<ResolvedFile> {
        let file = self.find(file_id).await?;
        let path = resolve_within(&self.upload_root, &file.file_path)?;
        if !is_file(&path).await {
            return Err(AppError::not_found(format!(
                "File {} is missing on disk",
                file.file_name
            )));
        }
        Ok(ResolvedFile { file, path })
    }

    /// Delete the row of a stored file and, best effort, the file itself.
    pub async fn delete_file(&self, file_id: Uuid) -> AppResult<StoredFile> {
        let file = self.find(file_id).await?;
        let path = resolve_within(&self.upload_root, &file.file_path)?;

        if !self.store.delete_file(file_id).await? {
            return Err(AppError::not_found(format!("File {file_id} not found")));
        }

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(
                file_id = %file_id,
                path = %path.display(),
                error = %e,
                "Failed to remove physical file"
            );
        }

        info!(file_id = %file_id, name = %file.file_name, "File deleted");
        Ok(file)
    }

    /// Zip every file of one version of a program into `dest_dir`.
    ///
    /// Without a label the latest version is used. Files whose stored
    /// path escapes the root are left out.
    pub async fn build_version_bundle(
        &self,
        program_id: Uuid,
        version: Option<&str>,
        dest_dir: &Path,
    ) -> AppResult<VersionBundle> {
        let program = self
            .store
            .find_program(program_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Program {program_id} not found")))?;

        let version = match version {
            Some(label) => label.to_string(),
            None => self
                .store
                .files_for_program(program_id)
                .await?
                .into_iter()
                .next()
                .map(|f| f.version)
                .ok_or_else(|| {
                    AppError::not_found(format!("Program {program_id} has no files"))
                })?,
        };

        let files = self.store.files_for_version(program_id, &version).await?;
        if files.is_empty() {
            return Err(AppError::not_found(format!(
                "Version {version} of program {program_id} has no files"
            )));
        }

        let single = files.len() == 1;
        let mut entries = Vec::with_capacity(files.len());
        for file in &files {
            match resolve_within(&self.upload_root, &file.file_path) {
                Ok(source) => entries.push(BundleEntry {
                    source,
                    name: bundle_entry_name(file, single),
                }),
                Err(e) => warn!(file_id = %file.id, error = %e, "Skipping file in bundle"),
            }
        }

        let code = if program.code.is_empty() {
            program.id.to_string()
        } else {
            program.code.clone()
        };
        let path = dest_dir.join(format!("{code}_{version}.zip"));

        let dest = path.clone();
        let summary =
            archive::run_blocking(move || archive::build_bundle_archive(&entries, &dest)).await?;

        info!(
            program_id = %program_id,
            version = %version,
            files = summary.files,
            path = %path.display(),
            "Version bundle created"
        );
        Ok(VersionBundle {
            path,
            version,
            summary,
        })
    }

    async fn find(&self, file_id: Uuid) -> AppResult<StoredFile> {
        self.store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }
}

/// Entry name of a file inside a version bundle.
fn bundle_entry_name(file: &StoredFile, single: bool) -> String {
    if single {
        file.file_name.clone()
    } else {
        format!("{}_{}", file.id, file.file_name)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;

    use progstore_core::error::ErrorKind;
    use progstore_database::MemoryMetadataStore;
    use progstore_entity::file::CreateStoredFile;

    use super::*;

    async fn stored(
        store: &MemoryMetadataStore,
        root: &Path,
        program_id: Uuid,
        version: &str,
        rel: &str,
    ) -> StoredFile {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel.as_bytes()).unwrap();
        store
            .create_file(&CreateStoredFile {
                program_id,
                file_name: path.file_name().unwrap().to_string_lossy().into_owned(),
                file_path: rel.to_string(),
                file_size: rel.len() as i64,
                file_type: None,
                version: version.to_string(),
                uploaded_by: None,
                description: None,
            })
            .await
            .unwrap()
    }

    async fn setup() -> (tempfile::TempDir, Arc<MemoryMetadataStore>, FileService, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryMetadataStore::new());
        let vehicle = store.insert_vehicle_model("QC25", "QC25").await;
        let line = store.insert_production_line("LineA", "LA").await;
        let program = store
            .insert_program("Widget", "P001", line.id, vehicle.id)
            .await;
        let service = FileService::new(store.clone(), dir.path().join("uploads"));
        (dir, store, service, program.id)
    }

    #[tokio::test]
    async fn test_resolve_download() {
        let (dir, store, service, program_id) = setup().await;
        let root = dir.path().join("uploads");
        let file = stored(&store, &root, program_id, "1.0", "v1/a.nc").await;

        let resolved = service.resolve_download(file.id).await.unwrap();
        assert_eq!(resolved.path, root.join("v1/a.nc"));

        fs::remove_file(&resolved.path).unwrap();
        let err = service.resolve_download(file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_escaping_stored_path_is_invalid() {
        let (_dir, store, service, program_id) = setup().await;
        let file = store
            .create_file(&CreateStoredFile {
                program_id,
                file_name: "passwd".into(),
                file_path: "../../etc/passwd".into(),
                file_size: 0,
                file_type: None,
                version: "1.0".into(),
                uploaded_by: None,
                description: None,
            })
            .await
            .unwrap();

        let err = service.resolve_download(file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
        let err = service.delete_file(file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
        assert!(store.find_file(file.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_physical_file() {
        let (dir, store, service, program_id) = setup().await;
        let root = dir.path().join("uploads");
        let file = stored(&store, &root, program_id, "1.0", "v1/a.nc").await;
        fs::remove_file(root.join("v1/a.nc")).unwrap();

        service.delete_file(file.id).await.unwrap();
        assert!(store.find_file(file.id).await.unwrap().is_none());

        let err = service.delete_file(file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_bundle_names_entries_by_count() {
        let (dir, store, service, program_id) = setup().await;
        let root = dir.path().join("uploads");
        stored(&store, &root, program_id, "1.0", "v1/only.nc").await;
        let a = stored(&store, &root, program_id, "2.0", "v2/a.nc").await;
        let b = stored(&store, &root, program_id, "2.0", "v2/b.nc").await;
        let out = dir.path().join("out");

        let single = service
            .build_version_bundle(program_id, Some("1.0"), &out)
            .await
            .unwrap();
        assert_eq!(single.path, out.join("P001_1.0.zip"));
        let mut zip = zip::ZipArchive::new(fs::File::open(&single.path).unwrap()).unwrap();
        let mut body = String::new();
        zip.by_name("only.nc").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "v1/only.nc");

        let latest = service
            .build_version_bundle(program_id, None, &out)
            .await
            .unwrap();
        assert_eq!(latest.version, "2.0");
        assert_eq!(latest.summary.files, 2);
        let mut zip = zip::ZipArchive::new(fs::File::open(&latest.path).unwrap()).unwrap();
        assert!(zip.by_name(&format!("{}_a.nc", a.id)).is_ok());
        assert!(zip.by_name(&format!("{}_b.nc", b.id)).is_ok());
    }
}
