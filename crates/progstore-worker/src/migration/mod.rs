//! Layout migration: state tracking, the run itself, and rollback.

pub mod engine;
pub mod manifest;
pub mod rollback;
pub mod state;

pub use engine::{MigrationEngine, MigrationHandle};
pub use manifest::{ManifestEntry, MigrationManifest};
pub use rollback::RollbackReport;
pub use state::MigrationTracker;
