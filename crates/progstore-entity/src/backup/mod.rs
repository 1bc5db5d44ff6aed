//! Backup artifact entities.

pub mod artifact;

pub use artifact::{BackupArtifact, BackupKind};
