//! Database models for reference cutting parameters (material + tool type combinations).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{CuttingParameterId, UserId};

#[derive(Debug, Clone, FromRow)]
pub struct CuttingParameter {
    pub id: CuttingParameterId,
    pub user_id: UserId,
    pub material: String,
    pub tool_type: String,
    pub rpm: Option<i32>,
    pub feed_rate: Option<f64>,
    pub depth_of_cut: Option<f64>,
    /// Axial depth of cut
    pub ap: Option<f64>,
    /// Radial width of cut
    pub ae: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CuttingParameterDBRequest {
    pub material: String,
    pub tool_type: String,
    pub rpm: Option<i32>,
    pub feed_rate: Option<f64>,
    pub depth_of_cut: Option<f64>,
    pub ap: Option<f64>,
    pub ae: Option<f64>,
    pub notes: Option<String>,
}
