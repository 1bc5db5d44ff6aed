//! Program file upload into the canonical layout.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use progstore_core::config::StorageConfig;
use progstore_core::error::{AppError, ErrorKind};
use progstore_core::result::AppResult;
use progstore_database::MetadataStore;
use progstore_entity::file::{CreateStoredFile, ProgramVersion, StoredFile, extension_of};
use progstore_storage::filesystem::ensure_parent;
use progstore_storage::paths::relative_to;

use super::ledger::VersionLedger;
use super::locate::ProgramContext;

/// One file of an upload request.
#[derive(Debug, Clone, Validate)]
pub struct UploadFile {
    /// Display name, used verbatim as the on-disk file name.
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,
    /// File content.
    pub content: Bytes,
}

/// Upload of one or more files under a program version.
#[derive(Debug, Clone, Validate)]
pub struct UploadRequest {
    /// Target program.
    pub program_id: Uuid,
    /// Version label.
    #[validate(length(min = 1, max = 50, message = "Version is required"))]
    pub version: String,
    /// Description applied to every file.
    pub description: Option<String>,
    /// Uploader.
    pub uploaded_by: Option<Uuid>,
    /// Files to store; at least one.
    pub files: Vec<UploadFile>,
}

/// What an upload stored.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Whether the label was new for the program.
    pub is_new_version: bool,
    /// Stored file rows, in request order.
    pub files: Vec<StoredFile>,
    /// Version rows created.
    pub versions: Vec<ProgramVersion>,
}

/// Writes uploaded files and records them in the version ledger.
#[derive(Debug, Clone)]
pub struct UploadService {
    /// Metadata store.
    store: Arc<dyn MetadataStore>,
    /// Version bookkeeping.
    ledger: VersionLedger,
    /// Root of the program-file tree.
    upload_root: PathBuf,
    /// Per-file size limit.
    max_upload_size_bytes: u64,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(store: Arc<dyn MetadataStore>, config: &StorageConfig) -> Self {
        Self {
            ledger: VersionLedger::new(Arc::clone(&store)),
            store,
            upload_root: config.upload_root_path(),
            max_upload_size_bytes: config.max_upload_size_bytes,
        }
    }

    /// Store every file of `request` under the program's canonical
    /// version directory. Existing files of the same name are replaced.
    pub async fn upload(&self, request: UploadRequest) -> AppResult<UploadOutcome> {
        request
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;
        if request.files.is_empty() {
            return Err(AppError::validation("At least one file is required"));
        }
        for file in &request.files {
            file.validate()
                .map_err(|e| AppError::validation(e.to_string()))?;
            check_file_name(&file.file_name)?;
            if file.content.len() as u64 > self.max_upload_size_bytes {
                return Err(AppError::validation(format!(
                    "File '{}' exceeds maximum upload size of {} bytes",
                    file.file_name, self.max_upload_size_bytes
                )));
            }
        }

        let ctx = ProgramContext::load(self.store.as_ref(), request.program_id).await?;
        let coordinates = ctx.coordinates(&request.version);

        let is_new_version = self
            .store
            .find_version_by_label(request.program_id, &request.version)
            .await?
            .is_none();
        let batch_size = request.files.len();

        let mut outcome = UploadOutcome {
            is_new_version,
            files: Vec::with_capacity(batch_size),
            versions: Vec::new(),
        };

        for file in &request.files {
            let target = coordinates.file_path(&self.upload_root, &file.file_name);
            let stored_path = relative_to(&self.upload_root, &target)?;

            ensure_parent(&target).await?;
            tokio::fs::write(&target, &file.content).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to write {}", target.display()),
                    e,
                )
            })?;

            let recorded = self
                .ledger
                .record_upload(
                    &CreateStoredFile {
                        program_id: request.program_id,
                        file_name: file.file_name.clone(),
                        file_path: stored_path,
                        file_size: file.content.len() as i64,
                        file_type: extension_of(&file.file_name),
                        version: request.version.clone(),
                        uploaded_by: request.uploaded_by,
                        description: request.description.clone(),
                    },
                    is_new_version,
                    batch_size,
                )
                .await?;

            info!(
                file_id = %recorded.file.id,
                program_id = %request.program_id,
                version = %request.version,
                path = %recorded.file.file_path,
                size = recorded.file.file_size,
                "File uploaded"
            );

            outcome.files.push(recorded.file);
            outcome.versions.extend(recorded.version);
        }

        Ok(outcome)
    }
}

/// Reject file names that could leave their version directory.
fn check_file_name(name: &str) -> AppResult<()> {
    let unsafe_name = name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.contains("..")
        || name.trim() == ".";
    if unsafe_name {
        return Err(AppError::invalid_path(format!(
            "File name '{name}' is not allowed"
        )));
    }
    Ok(())
}
