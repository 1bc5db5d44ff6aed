//! Layout-migration status entities.

pub mod status;

pub use status::{MigrationState, MigrationStatus};
