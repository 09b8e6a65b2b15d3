//! Database models for the cutting-tool inventory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{ToolId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    Drill,
    EndMill,
    FaceMill,
    Insert,
    /// High-speed steel tooling
    Hss,
    Carbide,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drill => "drill",
            Self::EndMill => "end_mill",
            Self::FaceMill => "face_mill",
            Self::Insert => "insert",
            Self::Hss => "hss",
            Self::Carbide => "carbide",
        }
    }
}

impl std::str::FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drill" => Ok(Self::Drill),
            "end_mill" => Ok(Self::EndMill),
            "face_mill" => Ok(Self::FaceMill),
            "insert" => Ok(Self::Insert),
            "hss" => Ok(Self::Hss),
            "carbide" => Ok(Self::Carbide),
            _ => Err(format!("Unknown tool type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Tool {
    pub id: ToolId,
    pub user_id: UserId,
    pub name: String,
    #[sqlx(rename = "type")]
    pub tool_type: String,
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

impl Tool {
    pub fn kind(&self) -> ToolType {
        self.tool_type.parse().unwrap_or(ToolType::Carbide)
    }
}

#[derive(Debug, Clone)]
pub struct ToolDBRequest {
    pub name: String,
    pub tool_type: ToolType,
    pub material: Option<String>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
    pub flutes: Option<i32>,
    pub coating: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
    pub notes: Option<String>,
}
