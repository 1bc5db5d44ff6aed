//! Stored file and program version entities.

pub mod model;
pub mod version;

pub use model::{CreateStoredFile, StoredFile, extension_of};
pub use version::{CreateProgramVersion, ProgramVersion, VersionGroup};
