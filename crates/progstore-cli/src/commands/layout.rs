//! Legacy layout migration commands.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::output::{self, OutputFormat};
use progstore_core::error::AppError;
use progstore_entity::migration::{MigrationState, MigrationStatus};
use progstore_worker::{MigrationEngine, RollbackReport};

/// Arguments for layout commands
#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Layout subcommand
    #[command(subcommand)]
    pub command: LayoutCommand,
}

/// Layout subcommands
#[derive(Debug, Subcommand)]
pub enum LayoutCommand {
    /// Move flat-layout files into the program hierarchy
    Migrate,
    /// Copy a migration run's backups back into the upload tree
    Rollback {
        /// Run directory under `<backup_root>/file_migration`
        #[arg(long)]
        run_dir: PathBuf,
    },
}

/// Execute layout commands
pub async fn execute(
    args: &LayoutArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let store = super::create_store(&config).await?;
    let engine = MigrationEngine::new(
        store,
        config.storage.upload_root_path(),
        config.storage.backup_root_path(),
    );

    match &args.command {
        LayoutCommand::Migrate => {
            let status = migrate(&engine).await?;
            print_status(&status, format);
            if status.status == MigrationState::Failed {
                return Err(AppError::internal(
                    status
                        .error_msg
                        .unwrap_or_else(|| "Migration failed".to_string()),
                ));
            }
        }
        LayoutCommand::Rollback { run_dir } => {
            let report = engine.rollback_from(run_dir).await?;
            print_rollback(&report, format);
        }
    }

    Ok(())
}

/// Run a migration to the end, reporting progress on stderr.
///
/// Ctrl-C cancels the run between files.
async fn migrate(engine: &MigrationEngine) -> Result<MigrationStatus, AppError> {
    let cancel = CancellationToken::new();
    let handle = engine.start_with(cancel.clone()).await?;
    eprintln!("Migration run {} started", handle.run_id());

    let tracker = engine.tracker().clone();
    let progress = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        let mut last = None;
        loop {
            ticker.tick().await;
            let status = tracker.snapshot().await;
            if status.status != MigrationState::Running {
                break;
            }
            let done = status.migrated_files + status.failed_files;
            if last != Some(done) {
                eprintln!(
                    "  [{:>5.1}%] {}/{} {}",
                    status.progress, done, status.total_files, status.current_file
                );
                last = Some(done);
            }
        }
    });

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current file...");
            cancel.cancel();
        }
    });

    let status = handle.wait().await;
    progress.abort();
    interrupt.abort();
    status
}

fn print_status(status: &MigrationStatus, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_item(status, format);
        return;
    }

    match status.status {
        MigrationState::Completed => output::print_success("Migration completed"),
        _ => output::print_error(&format!("Migration ended as {}", status.status)),
    }
    output::print_kv("Total files", &status.total_files.to_string());
    output::print_kv("Migrated", &status.migrated_files.to_string());
    output::print_kv("Failed", &status.failed_files.to_string());
    if let (Some(start), Some(end)) = (status.start_time, status.end_time) {
        let elapsed = (end - start).num_milliseconds() as f64 / 1000.0;
        output::print_kv("Elapsed", &format!("{:.1}s", elapsed));
    }
    if !status.errors.is_empty() {
        output::print_warning("Errors:");
        for error in &status.errors {
            println!("    {}", error);
        }
    }
}

fn print_rollback(report: &RollbackReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_item(report, format);
        return;
    }

    output::print_success(&format!(
        "Restored {} file(s) from {}",
        report.restored.len(),
        report.run_dir.display()
    ));
    if !report.from_manifest {
        output::print_warning("No manifest found; files were copied directly under the root");
    }
    for failure in &report.failed {
        output::print_error(failure);
    }
}
