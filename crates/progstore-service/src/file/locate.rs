//! Resolution of a program to its place in the hierarchy.

use uuid::Uuid;

use progstore_core::error::AppError;
use progstore_core::result::AppResult;
use progstore_database::MetadataStore;
use progstore_entity::program::{ProductionLine, Program, VehicleModel};
use progstore_storage::ProgramCoordinates;

/// A program together with the line and vehicle model it belongs to.
#[derive(Debug, Clone)]
pub struct ProgramContext {
    /// The program.
    pub program: Program,
    /// Its production line.
    pub production_line: ProductionLine,
    /// Its vehicle model.
    pub vehicle_model: VehicleModel,
}

impl ProgramContext {
    /// Load the program and its parents. `NotFound` if any row is missing.
    pub async fn load(store: &dyn MetadataStore, program_id: Uuid) -> AppResult<Self> {
        let program = store
            .find_program(program_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Program {program_id} not found")))?;

        let production_line = store
            .find_production_line(program.production_line_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Production line {} of program {program_id} not found",
                    program.production_line_id
                ))
            })?;

        let vehicle_model = store
            .find_vehicle_model(program.vehicle_model_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Vehicle model {} of program {program_id} not found",
                    program.vehicle_model_id
                ))
            })?;

        Ok(Self {
            program,
            production_line,
            vehicle_model,
        })
    }

    /// Coordinates of `version` of this program in the path scheme.
    pub fn coordinates<'a>(&'a self, version: &'a str) -> ProgramCoordinates<'a> {
        ProgramCoordinates {
            vehicle_model: &self.vehicle_model.name,
            production_line: &self.production_line.name,
            program_code: &self.program.code,
            program_name: &self.program.name,
            version,
        }
    }
}
