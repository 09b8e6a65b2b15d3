//! API request/response models for drawing analyses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::analyses::{Analysis, AnalysisStatus, DrawingType, ProcessType};
use crate::types::{AnalysisId, DrawingId};

/// Request body for `PATCH /api/analyses/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisUpdate {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AnalysisId,
    pub title: String,
    /// The stored drawing, until the retention sweeper removes it
    #[schema(value_type = Option<String>, format = "uuid")]
    pub drawing_id: Option<DrawingId>,
    pub drawing_url: Option<String>,
    pub drawing_type: DrawingType,
    pub material: String,
    pub process_type: ProcessType,
    pub status: AnalysisStatus,
    /// Features detected in the drawing
    #[schema(value_type = Vec<Object>)]
    pub features: serde_json::Value,
    #[schema(value_type = Option<Object>)]
    pub machining_plan: Option<serde_json::Value>,
    /// Failure reason for `failed` analyses
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Analysis> for AnalysisResponse {
    fn from(db: Analysis) -> Self {
        Self {
            drawing_type: db.kind(),
            process_type: db.process(),
            status: db.analysis_status(),
            id: db.id,
            title: db.title,
            drawing_id: db.drawing_id,
            drawing_url: db.drawing_url,
            material: db.material,
            features: db.features,
            machining_plan: db.machining_plan,
            error: db.error,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
