//! Program hierarchy entities.

pub mod model;

pub use model::{ProductionLine, Program, VehicleModel};
