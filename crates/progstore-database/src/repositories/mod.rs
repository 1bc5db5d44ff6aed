//! PostgreSQL repositories, one per table group.

pub mod file;
pub mod program;
pub mod version;

pub use file::FileRepository;
pub use program::ProgramRepository;
pub use version::VersionRepository;
