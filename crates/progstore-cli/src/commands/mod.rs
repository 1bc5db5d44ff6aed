//! CLI command definitions and dispatch.

pub mod backup;
pub mod config;
pub mod file;
pub mod layout;
pub mod restore;
pub mod schema;
pub mod version;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use progstore_core::config::AppConfig;
use progstore_core::error::AppError;
use progstore_core::traits::DatabaseDumper;
use progstore_database::{DatabasePool, MetadataStore, PgDumpTool, PgMetadataStore};

/// ProgStore: versioned manufacturing-program file storage
#[derive(Debug, Parser)]
#[command(name = "progstore", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database schema management
    Schema(schema::SchemaArgs),
    /// Backup creation and housekeeping
    Backup(backup::BackupArgs),
    /// Restore from a backup
    Restore(restore::RestoreArgs),
    /// Legacy layout migration
    Layout(layout::LayoutArgs),
    /// Program versions
    Version(version::VersionArgs),
    /// Program files
    File(file::FileArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Schema(args) => schema::execute(args, &self.config).await,
            Commands::Backup(args) => backup::execute(args, &self.config, self.format).await,
            Commands::Restore(args) => restore::execute(args, &self.config, self.format).await,
            Commands::Layout(args) => layout::execute(args, &self.config, self.format).await,
            Commands::Version(args) => version::execute(args, &self.config, self.format).await,
            Commands::File(args) => file::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub async fn load_config(path: &str) -> Result<AppConfig, AppError> {
    tracing::debug!("Loading configuration from '{}'", path);
    AppConfig::load(path)
}

/// Helper: create a database pool
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: metadata store over a fresh pool
pub async fn create_store(config: &AppConfig) -> Result<Arc<dyn MetadataStore>, AppError> {
    let pool = create_db_pool(config).await?;
    Ok(Arc::new(PgMetadataStore::new(pool.into_pool())))
}

/// Helper: the configured dump tool
pub fn create_dumper(config: &AppConfig) -> Arc<dyn DatabaseDumper> {
    Arc::new(PgDumpTool::new(&config.database, &config.backup))
}

/// Helper: ask before a destructive step, unless `force` is set
pub fn confirm(prompt: &str, force: bool) -> Result<bool, AppError> {
    if force {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {}", e)))
}
