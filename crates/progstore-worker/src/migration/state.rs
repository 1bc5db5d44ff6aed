//! Shared migration status.

use std::sync::Arc;

use tokio::sync::RwLock;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_core::types::MigrationRunId;
use progstore_entity::migration::MigrationStatus;

/// Owner of the migration status.
///
/// Clones share the same status. Readers get copies, never a guard.
#[derive(Debug, Clone, Default)]
pub struct MigrationTracker {
    inner: Arc<RwLock<MigrationStatus>>,
}

impl MigrationTracker {
    /// Create a tracker in the `not_started` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of the status.
    pub async fn snapshot(&self) -> MigrationStatus {
        self.inner.read().await.clone()
    }

    /// Reset the status for a new run unless one is running.
    ///
    /// The check and the reset happen under one write lock. Returns the
    /// fresh status.
    pub async fn try_begin(&self, run_id: MigrationRunId) -> AppResult<MigrationStatus> {
        let mut status = self.inner.write().await;
        if status.is_running() {
            return Err(AppError::conflict(format!(
                "Migration {} is already running",
                status
                    .run_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "(unknown)".to_string())
            )));
        }
        *status = MigrationStatus::started(run_id);
        Ok(status.clone())
    }

    /// Mutate the status under the write lock.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut MigrationStatus),
    {
        f(&mut *self.inner.write().await);
    }
}

#[cfg(test)]
mod tests {
    use progstore_core::error::ErrorKind;
    use progstore_entity::migration::MigrationState;

    use super::*;

    #[tokio::test]
    async fn test_second_begin_conflicts_and_keeps_first_run() {
        let tracker = MigrationTracker::new();
        let first = MigrationRunId::new();
        tracker.try_begin(first).await.unwrap();
        tracker.update(|s| s.migrated_files = 3).await;

        let err = tracker.try_begin(MigrationRunId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let status = tracker.snapshot().await;
        assert_eq!(status.run_id, Some(first));
        assert_eq!(status.migrated_files, 3);
        assert_eq!(status.status, MigrationState::Running);
    }

    #[tokio::test]
    async fn test_begin_after_terminal_state_resets() {
        let tracker = MigrationTracker::new();
        tracker.try_begin(MigrationRunId::new()).await.unwrap();
        tracker
            .update(|s| {
                s.record_error("x.nc: source file not found");
                s.finish(MigrationState::Completed);
            })
            .await;

        let fresh = tracker.try_begin(MigrationRunId::new()).await.unwrap();
        assert!(fresh.errors.is_empty());
        assert!(fresh.is_running());
    }
}
