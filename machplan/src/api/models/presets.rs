//! API request/response models for analysis presets (served under `/api/my/models`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::presets::{Preset, PresetDBRequest};
use crate::errors::{Error, Result};
use crate::types::{PresetId, UserId, non_empty, trimmed_opt};

/// Request body for creating or updating a preset. Updates replace both fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetRequest {
    #[schema(example = "Flanges em aço 1045")]
    pub name: Option<String>,
    /// Blank descriptions are stored as null
    pub description: Option<String>,
}

impl TryFrom<PresetRequest> for PresetDBRequest {
    type Error = Error;

    fn try_from(request: PresetRequest) -> Result<Self> {
        let name = request.name.as_deref().and_then(non_empty).ok_or_else(|| Error::BadRequest {
            message: "Nome do modelo é obrigatório.".to_string(),
        })?;

        Ok(Self {
            name,
            description: trimmed_opt(request.description.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PresetId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Preset> for PresetResponse {
    fn from(db: Preset) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            description: db.description,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// The caller's presets, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetListResponse {
    pub models: Vec<PresetResponse>,
    pub total: usize,
}

/// Confirmation returned after deleting a preset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetDeleteResponse {
    pub success: bool,
    #[schema(example = "Modelo excluído com sucesso.")]
    pub message: String,
}
