//! Database dump/restore collaborator.

use std::path::Path;

use async_trait::async_trait;

use crate::result::AppResult;

/// Produces and replays plain-text dumps of the relational state.
///
/// The storage engine treats the implementation as opaque: it supplies a
/// destination or source path and inspects success or failure. Failures
/// are reported as [`ErrorKind::ExternalTool`](crate::error::ErrorKind).
#[async_trait]
pub trait DatabaseDumper: Send + Sync + std::fmt::Debug {
    /// Write a dump of the current database to `dest`.
    async fn dump(&self, dest: &Path) -> AppResult<()>;

    /// Replay the dump stored at `src` into the current database.
    async fn restore(&self, src: &Path) -> AppResult<()>;
}
