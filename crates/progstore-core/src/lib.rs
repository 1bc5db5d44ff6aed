//! # progstore-core
//!
//! Core crate for ProgStore. Contains configuration schemas, the
//! collaborator traits the storage engine consumes, typed identifiers,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other ProgStore crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
