//! Database models for uploaded drawings.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{DrawingId, UserId};

/// Metadata row for a drawing blob held in [`DrawingStorage`](crate::storage::DrawingStorage).
#[derive(Debug, Clone, FromRow)]
pub struct Drawing {
    pub id: DrawingId,
    pub user_id: UserId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    /// Retention deadline; `None` keeps the drawing until it is deleted explicitly
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DrawingCreateDBRequest {
    pub id: DrawingId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub expires_at: Option<DateTime<Utc>>,
}
