//! Program, production line and vehicle model rows.
//!
//! The storage engine only reads these; their CRUD lives elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A manufacturing program (a set of versioned files).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Program {
    /// Unique program identifier.
    pub id: Uuid,
    /// Human-entered program name.
    pub name: String,
    /// Program code, used verbatim as the prefix of the program directory.
    pub code: String,
    /// The production line this program runs on.
    pub production_line_id: Uuid,
    /// The vehicle model this program targets.
    pub vehicle_model_id: Uuid,
    /// Denormalized label of the current version.
    pub version: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// When the program was created.
    pub created_at: DateTime<Utc>,
    /// When the program was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A production line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductionLine {
    /// Unique line identifier.
    pub id: Uuid,
    /// Line name (the path segment).
    pub name: String,
    /// Short line code.
    pub code: String,
    /// When the line was created.
    pub created_at: DateTime<Utc>,
}

/// A vehicle model.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VehicleModel {
    /// Unique vehicle model identifier.
    pub id: Uuid,
    /// Model name (the path segment).
    pub name: String,
    /// Short model code.
    pub code: String,
    /// Optional model series.
    pub series: Option<String>,
    /// When the model was created.
    pub created_at: DateTime<Utc>,
}
