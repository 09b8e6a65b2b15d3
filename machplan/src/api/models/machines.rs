//! API request/response models for machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::machines::{Machine, MachineDBRequest, MachineType};
use crate::errors::{Error, Result};
use crate::types::{MachineId, non_empty, trimmed_opt};

/// Request body for creating a machine or replacing all of its fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MachineRequest {
    #[schema(example = "Centro de usinagem Romi D800")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub machine_type: Option<MachineType>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[schema(example = 10000)]
    pub max_rpm: Option<i32>,
    /// Spindle power in kW
    pub max_power: Option<f64>,
    /// Work envelope along X, in mm
    pub work_area_x: Option<f64>,
    pub work_area_y: Option<f64>,
    pub work_area_z: Option<f64>,
    pub notes: Option<String>,
}

impl TryFrom<MachineRequest> for MachineDBRequest {
    type Error = Error;

    fn try_from(request: MachineRequest) -> Result<Self> {
        let name = request.name.as_deref().and_then(non_empty).ok_or_else(|| Error::BadRequest {
            message: "Nome da máquina é obrigatório.".to_string(),
        })?;
        let machine_type = request.machine_type.ok_or_else(|| Error::BadRequest {
            message: "Tipo da máquina é obrigatório.".to_string(),
        })?;

        Ok(Self {
            name,
            machine_type,
            manufacturer: trimmed_opt(request.manufacturer.as_deref()),
            model: trimmed_opt(request.model.as_deref()),
            max_rpm: request.max_rpm,
            max_power: request.max_power,
            work_area_x: request.work_area_x,
            work_area_y: request.work_area_y,
            work_area_z: request.work_area_z,
            notes: trimmed_opt(request.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MachineResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MachineId,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: MachineType,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub max_rpm: Option<i32>,
    pub max_power: Option<f64>,
    pub work_area_x: Option<f64>,
    pub work_area_y: Option<f64>,
    pub work_area_z: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Machine> for MachineResponse {
    fn from(db: Machine) -> Self {
        Self {
            machine_type: db.kind(),
            id: db.id,
            name: db.name,
            manufacturer: db.manufacturer,
            model: db.model,
            max_rpm: db.max_rpm,
            max_power: db.max_power,
            work_area_x: db.work_area_x,
            work_area_y: db.work_area_y,
            work_area_z: db.work_area_z,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_is_trimmed_and_validated() {
        let request: MachineRequest = serde_json::from_value(json!({
            "name": "  Torno CNC  ",
            "type": "turning",
            "manufacturer": " ",
            "max_rpm": 4500
        }))
        .unwrap();

        let db = MachineDBRequest::try_from(request).unwrap();
        assert_eq!(db.name, "Torno CNC");
        assert_eq!(db.machine_type, MachineType::Turning);
        assert_eq!(db.manufacturer, None);
        assert_eq!(db.max_rpm, Some(4500));
    }

    #[test]
    fn test_missing_name_or_type_is_rejected() {
        let request: MachineRequest = serde_json::from_value(json!({"name": "", "type": "vertical"})).unwrap();
        assert!(matches!(MachineDBRequest::try_from(request), Err(Error::BadRequest { .. })));

        let request: MachineRequest = serde_json::from_value(json!({"name": "Fresadora"})).unwrap();
        assert!(matches!(MachineDBRequest::try_from(request), Err(Error::BadRequest { .. })));
    }
}
