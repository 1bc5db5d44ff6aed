//! Migration state machine and status snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use progstore_core::types::MigrationRunId;

/// State of the layout migration.
///
/// `NotStarted → Running → {Completed, Failed}`; a new run may start from
/// any state except `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// No run has happened in this process.
    #[default]
    NotStarted,
    /// A run is in progress.
    Running,
    /// The last run processed every file (individual files may have failed).
    Completed,
    /// The last run aborted during setup or was cancelled.
    Failed,
}

impl MigrationState {
    /// Check if the state is terminal for the current run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Return the state as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of a migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Identifier of the run this status describes.
    pub run_id: Option<MigrationRunId>,
    /// Number of stored files fetched at run start.
    pub total_files: usize,
    /// Files relocated or already in the canonical layout.
    pub migrated_files: usize,
    /// Files whose step failed.
    pub failed_files: usize,
    /// Percentage of files processed, 0 to 100.
    pub progress: f64,
    /// Display name of the file being processed.
    pub current_file: String,
    /// State machine position.
    pub status: MigrationState,
    /// When the run started.
    pub start_time: Option<DateTime<Utc>>,
    /// When the run ended.
    pub end_time: Option<DateTime<Utc>>,
    /// Last error message.
    pub error_msg: Option<String>,
    /// Every per-file failure and compensation outcome of the run.
    pub errors: Vec<String>,
}

impl MigrationStatus {
    /// Fresh status for a run that is about to start.
    pub fn started(run_id: MigrationRunId) -> Self {
        Self {
            run_id: Some(run_id),
            status: MigrationState::Running,
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Check if a run is in progress.
    pub fn is_running(&self) -> bool {
        self.status == MigrationState::Running
    }

    /// Recompute `progress` from the number of processed files.
    pub fn set_progress(&mut self, processed: usize) {
        self.progress = if self.total_files == 0 {
            100.0
        } else {
            processed as f64 / self.total_files as f64 * 100.0
        };
    }

    /// Append an entry to the error trail and make it the last error.
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error_msg = Some(message.clone());
        self.errors.push(message);
    }

    /// Move to a terminal state and stamp the end time.
    pub fn finish(&mut self, state: MigrationState) {
        self.status = state;
        self.end_time = Some(Utc::now());
        self.current_file.clear();
    }
}
