//! Database schema commands.

use clap::{Args, Subcommand};

use crate::output;
use progstore_core::error::AppError;

/// Arguments for the schema command
#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Schema subcommand
    #[command(subcommand)]
    pub command: SchemaCommand,
}

/// Schema subcommands
#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    /// Apply all pending SQL migrations
    Run,
}

/// Execute schema commands
pub async fn execute(args: &SchemaArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let pool = super::create_db_pool(&config).await?;

    match &args.command {
        SchemaCommand::Run => {
            println!("Applying schema migrations...");
            progstore_database::migration::run_migrations(pool.pool()).await?;
            output::print_success("Schema is up to date.");
        }
    }

    Ok(())
}
