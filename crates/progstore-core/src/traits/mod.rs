//! Collaborator traits defined in `progstore-core` and implemented by
//! other crates.

pub mod dump;

pub use dump::DatabaseDumper;
