//! Database models for drawing analyses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{AnalysisId, DrawingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DrawingType {
    Image,
    Pdf,
    Cad,
}

impl DrawingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Cad => "cad",
        }
    }
}

impl std::str::FromStr for DrawingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            "cad" => Ok(Self::Cad),
            _ => Err(format!("Unknown drawing type: {}", s)),
        }
    }
}

/// Which machining process the plan should cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Milling,
    Turning,
    #[default]
    Complete,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Milling => "milling",
            Self::Turning => "turning",
            Self::Complete => "complete",
        }
    }

    /// Shop-floor label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Milling => "Fresamento",
            Self::Turning => "Torneamento",
            Self::Complete => "Processo completo",
        }
    }
}

impl std::str::FromStr for ProcessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "milling" => Ok(Self::Milling),
            "turning" => Ok(Self::Turning),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("Unknown process type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown analysis status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Analysis {
    pub id: AnalysisId,
    pub user_id: UserId,
    pub title: String,
    pub drawing_id: Option<DrawingId>,
    pub drawing_url: Option<String>,
    pub drawing_type: String,
    pub material: String,
    pub process_type: String,
    pub status: String,
    pub features: serde_json::Value,
    pub machining_plan: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    pub fn analysis_status(&self) -> AnalysisStatus {
        self.status.parse().unwrap_or(AnalysisStatus::Processing)
    }

    pub fn kind(&self) -> DrawingType {
        self.drawing_type.parse().unwrap_or(DrawingType::Image)
    }

    pub fn process(&self) -> ProcessType {
        self.process_type.parse().unwrap_or_default()
    }
}

/// New analyses always start in `processing`.
#[derive(Debug, Clone)]
pub struct AnalysisCreateDBRequest {
    pub title: String,
    pub drawing_id: Option<DrawingId>,
    pub drawing_url: Option<String>,
    pub drawing_type: DrawingType,
    pub material: String,
    pub process_type: ProcessType,
}

#[derive(Debug, Clone)]
pub struct AnalysisUpdateDBRequest {
    pub title: String,
}
