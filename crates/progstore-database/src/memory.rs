//! In-memory metadata store.
//!
//! Used by tests and by local tooling that has no database. Every
//! operation takes one lock, so multi-step updates are atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_entity::file::{CreateProgramVersion, CreateStoredFile, ProgramVersion, StoredFile};
use progstore_entity::program::{ProductionLine, Program, VehicleModel};

use crate::store::MetadataStore;

#[derive(Debug, Default)]
struct State {
    vehicle_models: HashMap<Uuid, VehicleModel>,
    production_lines: HashMap<Uuid, ProductionLine>,
    programs: HashMap<Uuid, Program>,
    /// Insertion order doubles as creation order.
    files: Vec<StoredFile>,
    versions: Vec<ProgramVersion>,
}

/// [`MetadataStore`] kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    state: RwLock<State>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vehicle model.
    pub async fn insert_vehicle_model(&self, name: &str, code: &str) -> VehicleModel {
        let model = VehicleModel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            series: None,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .vehicle_models
            .insert(model.id, model.clone());
        model
    }

    /// Add a production line.
    pub async fn insert_production_line(&self, name: &str, code: &str) -> ProductionLine {
        let line = ProductionLine {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .production_lines
            .insert(line.id, line.clone());
        line
    }

    /// Add a program under an existing line and vehicle model.
    pub async fn insert_program(
        &self,
        name: &str,
        code: &str,
        production_line_id: Uuid,
        vehicle_model_id: Uuid,
    ) -> Program {
        let now = Utc::now();
        let program = Program {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            production_line_id,
            vehicle_model_id,
            version: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .programs
            .insert(program.id, program.clone());
        program
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn find_program(&self, id: Uuid) -> AppResult<Option<Program>> {
        Ok(self.state.read().await.programs.get(&id).cloned())
    }

    async fn find_production_line(&self, id: Uuid) -> AppResult<Option<ProductionLine>> {
        Ok(self.state.read().await.production_lines.get(&id).cloned())
    }

    async fn find_vehicle_model(&self, id: Uuid) -> AppResult<Option<VehicleModel>> {
        Ok(self.state.read().await.vehicle_models.get(&id).cloned())
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<StoredFile>> {
        let state = self.state.read().await;
        Ok(state.files.iter().find(|f| f.id == id).cloned())
    }

    async fn list_files(&self) -> AppResult<Vec<StoredFile>> {
        Ok(self.state.read().await.files.clone())
    }

    async fn files_for_program(&self, program_id: Uuid) -> AppResult<Vec<StoredFile>> {
        let state = self.state.read().await;
        let mut files: Vec<StoredFile> = state
            .files
            .iter()
            .rev()
            .filter(|f| f.program_id == program_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(files)
    }

    async fn files_for_version(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Vec<StoredFile>> {
        let state = self.state.read().await;
        Ok(state
            .files
            .iter()
            .rev()
            .filter(|f| f.program_id == program_id && f.version == version)
            .cloned()
            .collect())
    }

    async fn create_file(&self, data: &CreateStoredFile) -> AppResult<StoredFile> {
        let now = Utc::now();
        let file = StoredFile {
            id: Uuid::new_v4(),
            program_id: data.program_id,
            file_name: data.file_name.clone(),
            file_path: data.file_path.clone(),
            file_size: data.file_size,
            file_type: data.file_type.clone(),
            version: data.version.clone(),
            uploaded_by: data.uploaded_by,
            description: data.description.clone(),
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.files.push(file.clone());
        Ok(file)
    }

    async fn update_file_path(&self, id: Uuid, file_path: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let file = state
            .files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.file_path = file_path.to_string();
        file.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.files.len();
        state.files.retain(|f| f.id != id);
        Ok(state.files.len() < before)
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<ProgramVersion>> {
        let state = self.state.read().await;
        Ok(state.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn find_version_by_label(
        &self,
        program_id: Uuid,
        version: &str,
    ) -> AppResult<Option<ProgramVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .rev()
            .find(|v| v.program_id == program_id && v.version == version)
            .cloned())
    }

    async fn versions_for_program(&self, program_id: Uuid) -> AppResult<Vec<ProgramVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .rev()
            .filter(|v| v.program_id == program_id)
            .cloned()
            .collect())
    }

    async fn create_version(&self, data: &CreateProgramVersion) -> AppResult<ProgramVersion> {
        let now = Utc::now();
        let version = ProgramVersion {
            id: Uuid::new_v4(),
            program_id: data.program_id,
            version: data.version.clone(),
            file_id: data.file_id,
            uploaded_by: data.uploaded_by,
            change_log: data.change_log.clone(),
            is_current: false,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.versions.push(version.clone());
        Ok(version)
    }

    async fn set_current_version(
        &self,
        program_id: Uuid,
        version_id: Uuid,
    ) -> AppResult<ProgramVersion> {
        let mut state = self.state.write().await;
        let exists = state
            .versions
            .iter()
            .any(|v| v.id == version_id && v.program_id == program_id);
        if !exists {
            return Err(AppError::not_found(format!(
                "Version {version_id} not found for program {program_id}"
            )));
        }

        let now = Utc::now();
        let mut current = None;
        for version in state.versions.iter_mut().filter(|v| v.program_id == program_id) {
            let is_target = version.id == version_id;
            if version.is_current != is_target {
                version.is_current = is_target;
                version.updated_at = now;
            }
            if is_target {
                current = Some(version.clone());
            }
        }
        let current = current
            .ok_or_else(|| AppError::internal(format!("Version {version_id} vanished")))?;

        if let Some(program) = state.programs.get_mut(&program_id) {
            program.version = Some(current.version.clone());
            program.updated_at = now;
        }
        Ok(current)
    }
}
