//! Background jobs for ProgStore.
//!
//! This crate provides the layout migration that moves files stored under
//! the legacy flat layout into the canonical program hierarchy:
//! - A lock-guarded status tracker with point-in-time snapshots
//! - A run handle carrying the run id and a cancellation token
//! - A per-run manifest of backed-up files, used by rollback

pub mod migration;

pub use migration::{MigrationEngine, MigrationHandle, MigrationTracker, RollbackReport};
