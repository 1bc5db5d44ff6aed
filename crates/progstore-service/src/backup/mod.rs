//! Backup and restore of the metadata database and the program-file tree.

pub mod manager;
pub mod naming;
pub mod restore;
pub mod scratch;

pub use manager::BackupManager;
pub use restore::{RestoreManager, RestoreOutcome};
pub use scratch::ScratchDir;
