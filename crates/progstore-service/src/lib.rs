//! # progstore-service
//!
//! Business logic of ProgStore: the version ledger, upload and download
//! of program files, and the backup and restore managers.
//!
//! Services follow constructor injection: the metadata store and the
//! database dumper are handed in as `Arc` trait objects, roots as paths.

pub mod backup;
pub mod file;

pub use backup::{BackupManager, RestoreManager, RestoreOutcome, ScratchDir};
pub use file::{FileService, ProgramContext, UploadService, VersionLedger};
