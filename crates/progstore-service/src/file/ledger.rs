//! Version ledger: which version of a program is current, and how its
//! files group by version label.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_database::MetadataStore;
use progstore_entity::file::{
    CreateProgramVersion, CreateStoredFile, ProgramVersion, StoredFile, VersionGroup,
};

/// Result of recording one uploaded file.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    /// The stored file row.
    pub file: StoredFile,
    /// The version row created for it, if any.
    pub version: Option<ProgramVersion>,
}

/// Records uploads and manages current-version state.
#[derive(Debug, Clone)]
pub struct VersionLedger {
    /// Metadata store.
    store: Arc<dyn MetadataStore>,
}

impl VersionLedger {
    /// Creates a new version ledger.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Insert a stored file and its version bookkeeping.
    ///
    /// A version row is created when the label is new for the program or
    /// the file arrived in a multi-file batch. Only a new label becomes
    /// current; rows added to an existing label stay non-current.
    pub async fn record_upload(
        &self,
        data: &CreateStoredFile,
        is_new_version: bool,
        batch_size: usize,
    ) -> AppResult<RecordedUpload> {
        let file = self.store.create_file(data).await?;

        if !is_new_version && batch_size <= 1 {
            return Ok(RecordedUpload {
                file,
                version: None,
            });
        }

        let mut version = self
            .store
            .create_version(&CreateProgramVersion {
                program_id: file.program_id,
                version: file.version.clone(),
                file_id: Some(file.id),
                uploaded_by: file.uploaded_by,
                change_log: file.description.clone(),
            })
            .await?;

        if is_new_version {
            version = self
                .store
                .set_current_version(file.program_id, version.id)
                .await?;
            info!(
                program_id = %file.program_id,
                version = %version.version,
                "New version became current"
            );
        }

        Ok(RecordedUpload {
            file,
            version: Some(version),
        })
    }

    /// Aggregate a program's files and version records by label, newest
    /// first.
    ///
    /// When no group is current, the newest one is reported current in
    /// the response only.
    pub async fn group_by_version(&self, program_id: Uuid) -> AppResult<Vec<VersionGroup>> {
        let files = self.store.files_for_program(program_id).await?;
        let records = self.store.versions_for_program(program_id).await?;
        Ok(group_versions(&records, &files))
    }

    /// Make a version the only current version of its program.
    pub async fn activate_version(&self, version_id: Uuid) -> AppResult<ProgramVersion> {
        let version = self
            .store
            .find_version(version_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Version {version_id} not found")))?;

        let current = self
            .store
            .set_current_version(version.program_id, version.id)
            .await?;

        info!(
            program_id = %current.program_id,
            version = %current.version,
            "Version activated"
        );
        Ok(current)
    }
}

/// Build version groups from records (newest first) and files (newest
/// first within each label).
fn group_versions(records: &[ProgramVersion], files: &[StoredFile]) -> Vec<VersionGroup> {
    let mut labels: Vec<&str> = Vec::new();
    for label in records
        .iter()
        .map(|r| r.version.as_str())
        .chain(files.iter().map(|f| f.version.as_str()))
    {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    let mut groups: Vec<VersionGroup> = labels
        .into_iter()
        .filter_map(|label| {
            let group_files: Vec<StoredFile> =
                files.iter().filter(|f| f.version == label).cloned().collect();
            let record = records
                .iter()
                .filter(|r| r.version == label)
                .find(|r| r.is_current)
                .or_else(|| records.iter().find(|r| r.version == label));

            let (version_id, change_log, is_current, created_at, uploaded_by) = match record {
                Some(r) => (
                    Some(r.id),
                    r.change_log.clone(),
                    r.is_current,
                    r.created_at,
                    r.uploaded_by,
                ),
                None => {
                    let first = group_files.first()?;
                    (
                        None,
                        first.description.clone(),
                        false,
                        first.created_at,
                        first.uploaded_by,
                    )
                }
            };

            Some(VersionGroup {
                version: label.to_string(),
                version_id,
                change_log,
                is_current,
                created_at,
                uploaded_by,
                file_count: group_files.len(),
                files: group_files,
            })
        })
        .collect();

    groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if !groups.iter().any(|g| g.is_current) {
        if let Some(newest) = groups.first_mut() {
            newest.is_current = true;
        }
    }
    groups
}
