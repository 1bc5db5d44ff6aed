//! Program file services: upload, download, versioning.

pub mod locate;
pub mod ledger;
pub mod service;
pub mod upload;

pub use ledger::{RecordedUpload, VersionLedger};
pub use locate::ProgramContext;
pub use service::{FileService, ResolvedFile, VersionBundle};
pub use upload::{UploadFile, UploadOutcome, UploadRequest, UploadService};
