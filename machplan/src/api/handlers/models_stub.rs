//! `/api/models`: placeholder route kept so older dashboard builds get a response.
//! Presets live under `/api/my/models`.

use serde_json::Value;

use crate::api::extractors::Json;
use crate::api::models::status::{ModelsRouteEcho, ModelsRouteStatus};

#[utoipa::path(
    get,
    path = "/models",
    tag = "status",
    summary = "Models route status",
    responses((status = 200, description = "The route is alive", body = ModelsRouteStatus))
)]
pub async fn models_status() -> Json<ModelsRouteStatus> {
    Json(ModelsRouteStatus {
        ok: true,
        message: "Models route funcionando!".to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/models",
    tag = "status",
    summary = "Echo a models payload",
    request_body(content = Object, description = "Any JSON document"),
    responses((status = 200, description = "The payload, unchanged", body = ModelsRouteEcho))
)]
#[tracing::instrument(skip_all)]
pub async fn models_echo(Json(received): Json<Value>) -> Json<ModelsRouteEcho> {
    Json(ModelsRouteEcho { ok: true, received })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_models_stub(pool: PgPool) {
        let (app, _dir) = create_test_app(pool, None).await;

        app.get("/api/models")
            .await
            .assert_json(&json!({"ok": true, "message": "Models route funcionando!"}));

        let response = app.post("/api/models").json(&json!({"name": "Flange", "tags": ["aço"]})).await;
        response.assert_status_ok();
        response.assert_json(&json!({"ok": true, "received": {"name": "Flange", "tags": ["aço"]}}));
    }
}
