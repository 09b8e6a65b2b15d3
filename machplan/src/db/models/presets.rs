//! Database models for named analysis presets, stored in the `models` table.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{PresetId, UserId};

/// Suffix appended to the name of a duplicated preset.
pub const COPY_SUFFIX: &str = " (cópia)";

#[derive(Debug, Clone, FromRow)]
pub struct Preset {
    pub id: PresetId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create and update share a shape: name is required, description optional.
/// Both are expected to be trimmed already.
#[derive(Debug, Clone)]
pub struct PresetDBRequest {
    pub name: String,
    pub description: Option<String>,
}
