//! Program version entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::model::StoredFile;

/// A named version of a program's file set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgramVersion {
    /// Unique version identifier.
    pub id: Uuid,
    /// The owning program.
    pub program_id: Uuid,
    /// Version label, e.g. `"1.0"`.
    pub version: String,
    /// Representative file of this version (informational).
    pub file_id: Option<Uuid>,
    /// Who uploaded the version.
    pub uploaded_by: Option<Uuid>,
    /// Change-log text.
    pub change_log: Option<String>,
    /// Whether this is the program's current version.
    pub is_current: bool,
    /// When the version was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a new program version row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProgramVersion {
    /// The owning program.
    pub program_id: Uuid,
    /// Version label.
    pub version: String,
    /// Representative file.
    pub file_id: Option<Uuid>,
    /// Who uploaded the version.
    pub uploaded_by: Option<Uuid>,
    /// Change-log text.
    pub change_log: Option<String>,
}

/// Files of a program aggregated under one version label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionGroup {
    /// Version label.
    pub version: String,
    /// The version record, when one exists.
    pub version_id: Option<Uuid>,
    /// Change-log text, from the record or the first file's description.
    pub change_log: Option<String>,
    /// Whether this version is current (possibly inferred).
    pub is_current: bool,
    /// Creation time, from the record or the first file.
    pub created_at: DateTime<Utc>,
    /// Uploader, from the record or the first file.
    pub uploaded_by: Option<Uuid>,
    /// Files stored under this label.
    pub files: Vec<StoredFile>,
    /// Number of files stored under this label.
    pub file_count: usize,
}
