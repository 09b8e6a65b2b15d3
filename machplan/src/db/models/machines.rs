//! Database models for machine tools in a user's shop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{MachineId, UserId};

/// Kind of machine tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    /// Vertical milling machine
    Vertical,
    /// Horizontal milling machine
    Horizontal,
    /// Lathe
    Turning,
    MachiningCenter,
}

impl MachineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
            Self::Turning => "turning",
            Self::MachiningCenter => "machining_center",
        }
    }
}

impl std::str::FromStr for MachineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            "turning" => Ok(Self::Turning),
            "machining_center" => Ok(Self::MachiningCenter),
            _ => Err(format!("Unknown machine type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Machine {
    pub id: MachineId,
    pub user_id: UserId,
    pub name: String,
    #[sqlx(rename = "type")]
    pub machine_type: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub max_rpm: Option<i32>,
    /// Spindle power in kW
    pub max_power: Option<f64>,
    pub work_area_x: Option<f64>,
    pub work_area_y: Option<f64>,
    pub work_area_z: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Machine {
    pub fn kind(&self) -> MachineType {
        self.machine_type.parse().unwrap_or(MachineType::MachiningCenter)
    }
}

/// Full set of writable machine columns, used for both create and replace.
#[derive(Debug, Clone)]
pub struct MachineDBRequest {
    pub name: String,
    pub machine_type: MachineType,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub max_rpm: Option<i32>,
    pub max_power: Option<f64>,
    pub work_area_x: Option<f64>,
    pub work_area_y: Option<f64>,
    pub work_area_z: Option<f64>,
    pub notes: Option<String>,
}
