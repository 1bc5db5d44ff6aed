//! Backup commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use progstore_core::error::AppError;
use progstore_entity::backup::BackupArtifact;
use progstore_service::BackupManager;

/// Arguments for backup commands
#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Backup subcommand
    #[command(subcommand)]
    pub command: BackupCommand,
}

/// Backup subcommands
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Create a backup
    Create {
        /// What to back up
        #[command(subcommand)]
        target: BackupTarget,
    },
    /// List backups, newest first
    List,
    /// Delete a backup
    Delete {
        /// Backup file name
        name: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Copy a backup out of the backup directory
    Download {
        /// Backup file name
        name: String,
        /// Destination file or directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Backup targets
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum BackupTarget {
    /// SQL dump of the database
    Database,
    /// Zip of the upload tree
    Files,
    /// Database dump and upload tree in one zip
    Full,
}

/// Backup row for table output
#[derive(Debug, Serialize, Tabled)]
pub struct BackupRow {
    /// File name
    #[tabled(rename = "Name")]
    pub name: String,
    /// Kind
    #[tabled(rename = "Kind")]
    pub kind: String,
    /// Size
    #[tabled(rename = "Size")]
    pub size: String,
    /// Timestamp
    #[tabled(rename = "Created")]
    pub created_at: String,
}

impl From<&BackupArtifact> for BackupRow {
    fn from(artifact: &BackupArtifact) -> Self {
        Self {
            name: artifact.name.clone(),
            kind: artifact.kind.to_string(),
            size: output::human_size(artifact.size_bytes),
            created_at: artifact.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute backup commands
pub async fn execute(
    args: &BackupArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let manager = BackupManager::new(
        super::create_dumper(&config),
        config.storage.upload_root_path(),
        config.storage.backup_root_path(),
    );

    match &args.command {
        BackupCommand::Create { target } => {
            let artifact = match target {
                BackupTarget::Database => manager.create_database_backup().await?,
                BackupTarget::Files => manager.create_files_backup().await?,
                BackupTarget::Full => manager.create_full_backup().await?,
            };
            match format {
                OutputFormat::Json => output::print_item(&artifact, format),
                OutputFormat::Table => {
                    output::print_success(&format!("Backup created: {}", artifact.name));
                    output::print_kv("Path", &artifact.path.display().to_string());
                    output::print_kv("Size", &output::human_size(artifact.size_bytes));
                }
            }
        }
        BackupCommand::List => {
            let backups = manager.list_backups().await?;
            let rows: Vec<BackupRow> = backups.iter().map(BackupRow::from).collect();
            output::print_list(&rows, format);
        }
        BackupCommand::Delete { name, force } => {
            let artifact = manager.download_backup(name).await?;
            let prompt = format!("Delete backup '{}'? This cannot be undone.", artifact.name);
            if !super::confirm(&prompt, *force)? {
                println!("Cancelled.");
                return Ok(());
            }
            manager.delete_backup(name).await?;
            output::print_success(&format!("Deleted backup '{}'", name));
        }
        BackupCommand::Download { name, output: dest } => {
            let artifact = manager.download_backup(name).await?;
            let target = if tokio::fs::metadata(dest).await.is_ok_and(|m| m.is_dir()) {
                dest.join(&artifact.name)
            } else {
                dest.clone()
            };
            progstore_storage::filesystem::copy_file(&artifact.path, &target).await?;
            output::print_success(&format!(
                "Copied '{}' to {}",
                artifact.name,
                target.display()
            ));
        }
    }

    Ok(())
}
