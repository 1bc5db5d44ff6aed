//! Stored file entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A physical file belonging to one version of a program.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredFile {
    /// Unique file identifier.
    pub id: Uuid,
    /// The owning program.
    pub program_id: Uuid,
    /// Display name (including extension).
    pub file_name: String,
    /// Path relative to the storage root, `/`-separated.
    pub file_path: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Lowercase extension without the dot.
    pub file_type: Option<String>,
    /// Version label this file was uploaded under.
    pub version: String,
    /// Who uploaded the file.
    pub uploaded_by: Option<Uuid>,
    /// Free-text description.
    pub description: Option<String>,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl StoredFile {
    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_name)
    }
}

/// Data required to insert a new stored file row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStoredFile {
    /// The owning program.
    pub program_id: Uuid,
    /// Display name.
    pub file_name: String,
    /// Path relative to the storage root.
    pub file_path: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Lowercase extension without the dot.
    pub file_type: Option<String>,
    /// Version label.
    pub version: String,
    /// Who uploaded the file.
    pub uploaded_by: Option<Uuid>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Lowercase extension of a file name, `None` when it has none.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("legacy.DXF").as_deref(), Some("dxf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
