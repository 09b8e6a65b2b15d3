use axum::{extract::State, http::StatusCode};

use crate::AppState;
use crate::api::extractors::{Json, Path};
use crate::api::models::tools::{ToolRequest, ToolResponse};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Repository, Tools};
use crate::db::models::tools::ToolDBRequest;
use crate::errors::{Error, Result};
use crate::types::ToolId;

fn not_found(id: ToolId) -> Error {
    Error::NotFound {
        resource: "Tool".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    summary = "List tools",
    responses(
        (status = 200, description = "The caller's tools, newest first", body = Vec<ToolResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tools(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<ToolResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tools::new(&mut pool_conn);

    let tools = repo.list(current_user.id).await?;
    Ok(Json(tools.into_iter().map(ToolResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/tools",
    tag = "tools",
    summary = "Create tool",
    request_body = ToolRequest,
    responses(
        (status = 201, description = "Tool created", body = ToolResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_tool(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ToolRequest>,
) -> Result<(StatusCode, Json<ToolResponse>)> {
    let request = ToolDBRequest::try_from(create)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tools::new(&mut pool_conn);

    let tool = repo.create(current_user.id, &request).await?;
    Ok((StatusCode::CREATED, Json(ToolResponse::from(tool))))
}

#[utoipa::path(
    get,
    path = "/tools/{tool_id}",
    tag = "tools",
    summary = "Get tool",
    responses(
        (status = 200, description = "Tool details", body = ToolResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Tool not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("tool_id" = uuid::Uuid, Path, description = "Tool ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_tool(State(state): State<AppState>, Path(tool_id): Path<ToolId>, current_user: CurrentUser) -> Result<Json<ToolResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tools::new(&mut pool_conn);

    match repo.get_by_id(current_user.id, tool_id).await? {
        Some(tool) => Ok(Json(ToolResponse::from(tool))),
        None => Err(not_found(tool_id)),
    }
}

#[utoipa::path(
    put,
    path = "/tools/{tool_id}",
    tag = "tools",
    summary = "Replace tool",
    request_body = ToolRequest,
    responses(
        (status = 200, description = "Tool updated", body = ToolResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Tool not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("tool_id" = uuid::Uuid, Path, description = "Tool ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_tool(
    State(state): State<AppState>,
    Path(tool_id): Path<ToolId>,
    current_user: CurrentUser,
    Json(update): Json<ToolRequest>,
) -> Result<Json<ToolResponse>> {
    let request = ToolDBRequest::try_from(update)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tools::new(&mut pool_conn);

    if repo.get_by_id(current_user.id, tool_id).await?.is_none() {
        return Err(not_found(tool_id));
    }

    let tool = repo
        .update(current_user.id, tool_id, &request)
        .await?
        .ok_or_else(|| not_found(tool_id))?;
    Ok(Json(ToolResponse::from(tool)))
}

#[utoipa::path(
    delete,
    path = "/tools/{tool_id}",
    tag = "tools",
    summary = "Delete tool",
    responses(
        (status = 204, description = "Tool deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Tool not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("tool_id" = uuid::Uuid, Path, description = "Tool ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_tool(State(state): State<AppState>, Path(tool_id): Path<ToolId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tools::new(&mut pool_conn);

    if repo.delete(current_user.id, tool_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(tool_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::tools::ToolResponse;
    use crate::db::models::tools::ToolType;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_tool_create_list_delete(pool: PgPool) {
        let (app, _dir) = create_test_app(pool, None).await;
        let auth = auth_header(Uuid::new_v4());

        let response = app
            .post("/api/tools")
            .add_header(&auth.0, &auth.1)
            .json(&json!({
                "name": "Fresa topo 10mm",
                "type": "end_mill",
                "diameter": 10.0,
                "flutes": 4,
                "coating": "TiAlN"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let tool: ToolResponse = response.json();
        assert_eq!(tool.tool_type, ToolType::EndMill);
        assert_eq!(tool.flutes, Some(4));

        let tools: Vec<ToolResponse> = app.get("/api/tools").add_header(&auth.0, &auth.1).await.json();
        assert_eq!(tools.iter().map(|t| t.id).collect::<Vec<_>>(), vec![tool.id]);

        app.delete(&format!("/api/tools/{}", tool.id))
            .add_header(&auth.0, &auth.1)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        app.get(&format!("/api/tools/{}", tool.id))
            .add_header(&auth.0, &auth.1)
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_foreign_tool_is_not_found(pool: PgPool) {
        let (app, _dir) = create_test_app(pool, None).await;
        let owner = auth_header(Uuid::new_v4());
        let intruder = auth_header(Uuid::new_v4());

        let tool: ToolResponse = app
            .post("/api/tools")
            .add_header(&owner.0, &owner.1)
            .json(&json!({"name": "Broca 8mm", "type": "drill"}))
            .await
            .json();

        let response = app
            .put(&format!("/api/tools/{}", tool.id))
            .add_header(&intruder.0, &intruder.1)
            .json(&json!({"name": "Roubada", "type": "drill"}))
            .await;
        response.assert_status_not_found();
        assert_eq!(response.json::<serde_json::Value>()["error"], "Ferramenta não encontrada.");

        let unchanged: ToolResponse = app
            .get(&format!("/api/tools/{}", tool.id))
            .add_header(&owner.0, &owner.1)
            .await
            .json();
        assert_eq!(unchanged.name, "Broca 8mm");
    }
}
