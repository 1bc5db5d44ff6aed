//! Program version commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use progstore_core::error::AppError;
use progstore_entity::file::VersionGroup;
use progstore_service::VersionLedger;

/// Arguments for version commands
#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Version subcommand
    #[command(subcommand)]
    pub command: VersionCommand,
}

/// Version subcommands
#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// List a program's versions, newest first
    List {
        /// Program id
        program: Uuid,
    },
    /// Make a version the program's current one
    Activate {
        /// Version id
        version_id: Uuid,
    },
}

/// Version row for table output
#[derive(Debug, Serialize, Tabled)]
pub struct VersionRow {
    /// Label
    #[tabled(rename = "Version")]
    pub version: String,
    /// Version record id, if any
    #[tabled(rename = "ID")]
    pub id: String,
    /// Current marker
    #[tabled(rename = "Current")]
    pub current: String,
    /// Number of files
    #[tabled(rename = "Files")]
    pub files: usize,
    /// Change log
    #[tabled(rename = "Change log")]
    pub change_log: String,
    /// Timestamp
    #[tabled(rename = "Created")]
    pub created_at: String,
}

impl From<&VersionGroup> for VersionRow {
    fn from(group: &VersionGroup) -> Self {
        Self {
            version: group.version.clone(),
            id: group
                .version_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            current: if group.is_current { "*" } else { "" }.to_string(),
            files: group.file_count,
            change_log: group.change_log.clone().unwrap_or_default(),
            created_at: group.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute version commands
pub async fn execute(
    args: &VersionArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let ledger = VersionLedger::new(super::create_store(&config).await?);

    match &args.command {
        VersionCommand::List { program } => {
            let groups = ledger.group_by_version(*program).await?;
            match format {
                OutputFormat::Json => output::print_item(&groups, format),
                OutputFormat::Table => {
                    let rows: Vec<VersionRow> = groups.iter().map(VersionRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        VersionCommand::Activate { version_id } => {
            let version = ledger.activate_version(*version_id).await?;
            match format {
                OutputFormat::Json => output::print_item(&version, format),
                OutputFormat::Table => output::print_success(&format!(
                    "Version '{}' is now current",
                    version.version
                )),
            }
        }
    }

    Ok(())
}
