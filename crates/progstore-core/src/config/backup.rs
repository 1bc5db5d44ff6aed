//! Database dump/restore tool configuration.

use serde::{Deserialize, Serialize};

/// Settings for the external `pg_dump`/`psql` invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Path or name of the `pg_dump` executable.
    #[serde(default = "default_pg_dump")]
    pub pg_dump_path: String,
    /// Path or name of the `psql` executable.
    #[serde(default = "default_psql")]
    pub psql_path: String,
    /// Kill the tool after this many seconds. `0` disables the timeout.
    #[serde(default = "default_timeout")]
    pub command_timeout_seconds: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            pg_dump_path: default_pg_dump(),
            psql_path: default_psql(),
            command_timeout_seconds: default_timeout(),
        }
    }
}

fn default_pg_dump() -> String {
    "pg_dump".to_string()
}

fn default_psql() -> String {
    "psql".to_string()
}

fn default_timeout() -> u64 {
    3600
}
