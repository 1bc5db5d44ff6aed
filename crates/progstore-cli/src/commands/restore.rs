//! Restore commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use progstore_core::error::AppError;
use progstore_service::{RestoreManager, RestoreOutcome};

/// Arguments for restore commands
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Restore subcommand
    #[command(subcommand)]
    pub command: RestoreCommand,
}

/// Restore subcommands
#[derive(Debug, Subcommand)]
pub enum RestoreCommand {
    /// Replace the database with a database or full backup
    Database {
        /// Backup file name
        name: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Replace the upload tree with a files or full backup
    Files {
        /// Backup file name
        name: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Execute restore commands
pub async fn execute(
    args: &RestoreArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let manager = RestoreManager::new(
        super::create_dumper(&config),
        config.storage.upload_root_path(),
        config.storage.backup_root_path(),
    );

    let outcome = match &args.command {
        RestoreCommand::Database { name, force } => {
            let prompt = format!("Replace the current database with '{}'?", name);
            if !super::confirm(&prompt, *force)? {
                println!("Cancelled.");
                return Ok(());
            }
            manager.restore_database(name).await?
        }
        RestoreCommand::Files { name, force } => {
            let prompt = format!(
                "Delete '{}' and replace it with the contents of '{}'?",
                config.storage.upload_root, name
            );
            if !super::confirm(&prompt, *force)? {
                println!("Cancelled.");
                return Ok(());
            }
            manager.restore_files(name).await?
        }
    };

    report(&outcome, format);
    Ok(())
}

fn report(outcome: &RestoreOutcome, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_item(outcome, format);
        return;
    }

    output::print_success(&outcome.message);
    output::print_kv("Restored from", &outcome.restored_from);
    output::print_kv("Rollback point", &outcome.rollback_artifact);
    if !outcome.skipped_entries.is_empty() {
        output::print_warning(&format!(
            "{} archive entries were skipped:",
            outcome.skipped_entries.len()
        ));
        for entry in &outcome.skipped_entries {
            println!("    {}", entry);
        }
    }
}
