//! Program file commands.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use progstore_core::error::AppError;
use progstore_entity::file::StoredFile;
use progstore_service::file::{UploadFile, UploadRequest};
use progstore_service::{FileService, UploadService};

/// Arguments for file commands
#[derive(Debug, Args)]
pub struct FileArgs {
    /// File subcommand
    #[command(subcommand)]
    pub command: FileCommand,
}

/// File subcommands
#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Upload files under a program version
    Upload {
        /// Program id
        program: Uuid,
        /// Version label
        version: String,
        /// Local files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Description stored with every file
        #[arg(short, long)]
        description: Option<String>,
        /// Uploader id
        #[arg(long)]
        uploaded_by: Option<Uuid>,
    },
    /// Copy a stored file out of the upload tree
    Download {
        /// File id
        id: Uuid,
        /// Destination file or directory
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Delete a stored file
    Delete {
        /// File id
        id: Uuid,
    },
    /// Zip all files of one program version
    Bundle {
        /// Program id
        program: Uuid,
        /// Version label, latest when omitted
        #[arg(long)]
        version: Option<String>,
        /// Destination directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// File row for table output
#[derive(Debug, Serialize, Tabled)]
pub struct FileRow {
    /// File id
    #[tabled(rename = "ID")]
    pub id: String,
    /// Display name
    #[tabled(rename = "Name")]
    pub name: String,
    /// Version label
    #[tabled(rename = "Version")]
    pub version: String,
    /// Size
    #[tabled(rename = "Size")]
    pub size: String,
    /// Path under the upload root
    #[tabled(rename = "Path")]
    pub path: String,
}

impl From<&StoredFile> for FileRow {
    fn from(file: &StoredFile) -> Self {
        Self {
            id: file.id.to_string(),
            name: file.file_name.clone(),
            version: file.version.clone(),
            size: output::human_size(u64::try_from(file.file_size).unwrap_or(0)),
            path: file.file_path.clone(),
        }
    }
}

/// Execute file commands
pub async fn execute(
    args: &FileArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let store = super::create_store(&config).await?;

    match &args.command {
        FileCommand::Upload {
            program,
            version,
            paths,
            description,
            uploaded_by,
        } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in paths {
                files.push(read_upload(path).await?);
            }

            let service = UploadService::new(store, &config.storage);
            let outcome = service
                .upload(UploadRequest {
                    program_id: *program,
                    version: version.clone(),
                    description: description.clone(),
                    uploaded_by: *uploaded_by,
                    files,
                })
                .await?;

            if outcome.is_new_version {
                output::print_success(&format!("Version '{}' created and made current", version));
            } else {
                output::print_warning(&format!(
                    "Version '{}' already existed; the current version was not changed",
                    version
                ));
            }
            let rows: Vec<FileRow> = outcome.files.iter().map(FileRow::from).collect();
            output::print_list(&rows, format);
        }
        FileCommand::Download { id, output: dest } => {
            let resolved = FileService::new(store, config.storage.upload_root_path())
                .resolve_download(*id)
                .await?;
            let target = if tokio::fs::metadata(dest).await.is_ok_and(|m| m.is_dir()) {
                dest.join(&resolved.file.file_name)
            } else {
                dest.clone()
            };
            progstore_storage::filesystem::copy_file(&resolved.path, &target).await?;
            output::print_success(&format!(
                "Copied '{}' to {}",
                resolved.file.file_name,
                target.display()
            ));
        }
        FileCommand::Delete { id } => {
            let file = FileService::new(store, config.storage.upload_root_path())
                .delete_file(*id)
                .await?;
            output::print_success(&format!("Deleted '{}' ({})", file.file_name, file.id));
        }
        FileCommand::Bundle {
            program,
            version,
            output: dest,
        } => {
            let bundle = FileService::new(store, config.storage.upload_root_path())
                .build_version_bundle(*program, version.as_deref(), dest)
                .await?;
            output::print_success(&format!(
                "Bundled version '{}' into {}",
                bundle.version,
                bundle.path.display()
            ));
            output::print_kv("Files", &bundle.summary.files.to_string());
            output::print_kv("Size", &output::human_size(bundle.summary.bytes));
        }
    }

    Ok(())
}

/// Read a local file into an upload entry named after its last component.
async fn read_upload(path: &Path) -> Result<UploadFile, AppError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::validation(format!("'{}' is not a file", path.display())))?;
    let content = tokio::fs::read(path).await.map_err(|e| {
        AppError::not_found(format!("Cannot read '{}': {}", path.display(), e))
    })?;
    Ok(UploadFile {
        file_name,
        content: Bytes::from(content),
    })
}
