//! API request/response models for reference cutting parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::cutting_parameters::{CuttingParameter, CuttingParameterDBRequest};
use crate::errors::{Error, Result};
use crate::types::{CuttingParameterId, non_empty, trimmed_opt};

/// Request body for creating a cutting parameter or replacing all of its fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CuttingParameterRequest {
    #[schema(example = "Aço 1045")]
    pub material: Option<String>,
    #[schema(example = "end_mill")]
    pub tool_type: Option<String>,
    pub rpm: Option<i32>,
    /// Feed rate in mm/min
    pub feed_rate: Option<f64>,
    pub depth_of_cut: Option<f64>,
    /// Axial engagement in mm
    pub ap: Option<f64>,
    /// Radial engagement in mm
    pub ae: Option<f64>,
    pub notes: Option<String>,
}

impl TryFrom<CuttingParameterRequest> for CuttingParameterDBRequest {
    type Error = Error;

    fn try_from(request: CuttingParameterRequest) -> Result<Self> {
        let material = request.material.as_deref().and_then(non_empty).ok_or_else(|| Error::BadRequest {
            message: "Material é obrigatório.".to_string(),
        })?;
        let tool_type = request.tool_type.as_deref().and_then(non_empty).ok_or_else(|| Error::BadRequest {
            message: "Tipo de ferramenta é obrigatório.".to_string(),
        })?;

        Ok(Self {
            material,
            tool_type,
            rpm: request.rpm,
            feed_rate: request.feed_rate,
            depth_of_cut: request.depth_of_cut,
            ap: request.ap,
            ae: request.ae,
            notes: trimmed_opt(request.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CuttingParameterResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CuttingParameterId,
    pub material: String,
    pub tool_type: String,
    pub rpm: Option<i32>,
    pub feed_rate: Option<f64>,
    pub depth_of_cut: Option<f64>,
    pub ap: Option<f64>,
    pub ae: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CuttingParameter> for CuttingParameterResponse {
    fn from(db: CuttingParameter) -> Self {
        Self {
            id: db.id,
            material: db.material,
            tool_type: db.tool_type,
            rpm: db.rpm,
            feed_rate: db.feed_rate,
            depth_of_cut: db.depth_of_cut,
            ap: db.ap,
            ae: db.ae,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
