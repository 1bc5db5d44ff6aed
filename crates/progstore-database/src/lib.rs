//! # progstore-database
//!
//! The metadata store the storage engine reads program hierarchy from and
//! records files and versions into. Ships a PostgreSQL implementation
//! built from per-table repositories and an in-memory implementation, plus
//! the `pg_dump`/`psql` collaborator used by backup and restore.

pub mod connection;
pub mod credentials;
pub mod dump;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use dump::PgDumpTool;
pub use memory::MemoryMetadataStore;
pub use postgres::PgMetadataStore;
pub use store::MetadataStore;
