//! Responses of the small operational routes (log viewer, legacy models route).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogResponse {
    /// Contents of the server log file, or a short notice when there is nothing to show
    pub log: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelsRouteStatus {
    pub ok: bool,
    #[schema(example = "Models route funcionando!")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelsRouteEcho {
    pub ok: bool,
    /// The request body, unchanged
    #[schema(value_type = Object)]
    pub received: serde_json::Value,
}
