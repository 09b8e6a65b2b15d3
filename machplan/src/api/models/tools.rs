//! API request/response models for the tool inventory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::tools::{Tool, ToolDBRequest, ToolType};
use crate::errors::{Error, Result};
use crate::types::{ToolId, non_empty, trimmed_opt};

/// Request body for creating a tool or replacing all of its fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolRequest {
    #[schema(example = "Fresa topo 10mm")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: Option<ToolType>,
    /// Tool material, e.g. carbide or HSS
    pub material: Option<String>,
    /// Diameter in mm
    pub diameter: Option<f64>,
    /// Length in mm
    pub length: Option<f64>,
    pub flutes: Option<i32>,
    pub coating: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<ToolRequest> for ToolDBRequest {
    type Error = Error;

    fn try_from(request: ToolRequest) -> Result<Self> {
        let name = request.name.as_deref().and_then(non_empty).ok_or_else(|| Error::BadRequest {
            message: "Nome da ferramenta é obrigatório.".to_string(),
        })?;
        let tool_type = request.tool_type.ok_or_else(|| Error::BadRequest {
            message: "Tipo da ferramenta é obrigatório.".to_string(),
        })?;

        Ok(Self {
            name,
            tool_type,
            material: trimmed_opt(request.material.as_deref()),
            diameter: request.diameter,
            length: request.length,
            flutes: request.flutes,
            coating: trimmed_opt(request.coating.as_deref()),
            manufacturer: trimmed_opt(request.manufacturer.as_deref()),
            part_number: trimmed_opt(request.part_number.as_deref()),
            notes: trimmed_opt(request.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ToolId,
    pub name: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub material: Option<String>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
    pub flutes: Option<i32>,
    pub coating: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tool> for ToolResponse {
    fn from(db: Tool) -> Self {
        Self {
            tool_type: db.kind(),
            id: db.id,
            name: db.name,
            material: db.material,
            diameter: db.diameter,
            length: db.length,
            flutes: db.flutes,
            coating: db.coating,
            manufacturer: db.manufacturer,
            part_number: db.part_number,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
