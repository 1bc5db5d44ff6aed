//! # progstore-entity
//!
//! Domain entity models for ProgStore. Structs that mirror a database row
//! derive `sqlx::FromRow`; value objects reconstructed from the filesystem
//! or kept in process memory only derive the serde traits.

pub mod backup;
pub mod file;
pub mod migration;
pub mod program;
