//! The authenticated caller.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::UserId;

/// Identity resolved from the request credentials. Every owner-scoped query uses `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
}
