//! # progstore-storage
//!
//! On-disk conventions of ProgStore: the sanitizer and path scheme that
//! map program metadata to a canonical directory, lexical path-safety
//! checks, filesystem helpers, and the zip archive codec used by backup,
//! restore and migration.
//!
//! Archive functions are synchronous; async callers run them through
//! `tokio::task::spawn_blocking`.

pub mod archive;
pub mod filesystem;
pub mod layout;
pub mod paths;
pub mod sanitize;

pub use layout::{ProgramCoordinates, is_already_migrated, program_directory};
pub use sanitize::sanitize;
