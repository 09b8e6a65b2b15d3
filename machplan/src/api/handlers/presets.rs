//! Named analysis presets, served under `/api/my/models`.

use axum::{extract::State, http::StatusCode};

use crate::AppState;
use crate::api::extractors::{Json, Path};
use crate::api::models::presets::{PresetDeleteResponse, PresetListResponse, PresetRequest, PresetResponse};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Presets, Repository};
use crate::db::models::presets::PresetDBRequest;
use crate::errors::{Error, Result};
use crate::types::PresetId;

fn not_found(id: PresetId) -> Error {
    Error::NotFound {
        resource: "Model".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/my/models",
    tag = "presets",
    summary = "List presets",
    responses(
        (status = 200, description = "The caller's presets, newest first", body = PresetListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_presets(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<PresetListResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Presets::new(&mut pool_conn);

    let models: Vec<PresetResponse> = repo.list(current_user.id).await?.into_iter().map(PresetResponse::from).collect();
    Ok(Json(PresetListResponse {
        total: models.len(),
        models,
    }))
}

#[utoipa::path(
    post,
    path = "/my/models",
    tag = "presets",
    summary = "Create preset",
    request_body = PresetRequest,
    responses(
        (status = 201, description = "Preset created", body = PresetResponse),
        (status = 400, description = "Name missing or blank"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_preset(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<PresetRequest>,
) -> Result<(StatusCode, Json<PresetResponse>)> {
    let request = PresetDBRequest::try_from(create)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Presets::new(&mut pool_conn);

    let preset = repo.create(current_user.id, &request).await?;
    Ok((StatusCode::CREATED, Json(PresetResponse::from(preset))))
}

#[utoipa::path(
    get,
    path = "/my/models/{model_id}",
    tag = "presets",
    summary = "Get preset",
    responses(
        (status = 200, description = "Preset details", body = PresetResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Preset not found or owned by someone else"),
        (status = 500, description = "Internal server error")
    ),
    params(("model_id" = uuid::Uuid, Path, description = "Preset ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_preset(
    State(state): State<AppState>,
    Path(model_id): Path<PresetId>,
    current_user: CurrentUser,
) -> Result<Json<PresetResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Presets::new(&mut pool_conn);

    match repo.get_by_id(current_user.id, model_id).await? {
        Some(preset) => Ok(Json(PresetResponse::from(preset))),
        None => Err(not_found(model_id)),
    }
}

#[utoipa::path(
    patch,
    path = "/my/models/{model_id}",
    tag = "presets",
    summary = "Update preset",
    request_body = PresetRequest,
    responses(
        (status = 200, description = "Preset updated", body = PresetResponse),
        (status = 400, description = "Name missing or blank"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Preset not found or owned by someone else"),
        (status = 500, description = "Internal server error")
    ),
    params(("model_id" = uuid::Uuid, Path, description = "Preset ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_preset(
    State(state): State<AppState>,
    Path(model_id): Path<PresetId>,
    current_user: CurrentUser,
    Json(update): Json<PresetRequest>,
) -> Result<Json<PresetResponse>> {
    let request = PresetDBRequest::try_from(update)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Presets::new(&mut pool_conn);

    if repo.get_by_id(current_user.id, model_id).await?.is_none() {
        return Err(not_found(model_id));
    }

    let preset = repo
        .update(current_user.id, model_id, &request)
        .await?
        .ok_or_else(|| not_found(model_id))?;
    Ok(Json(PresetResponse::from(preset)))
}

#[utoipa::path(
    delete,
    path = "/my/models/{model_id}",
    tag = "presets",
    summary = "Delete preset",
    responses(
        (status = 200, description = "Preset deleted", body = PresetDeleteResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Preset not found or owned by someone else"),
        (status = 500, description = "Internal server error")
    ),
    params(("model_id" = uuid::Uuid, Path, description = "Preset ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_preset(
    State(state): State<AppState>,
    Path(model_id): Path<PresetId>,
    current_user: CurrentUser,
) -> Result<Json<PresetDeleteResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Presets::new(&mut pool_conn);

    if !repo.delete(current_user.id, model_id).await? {
        return Err(not_found(model_id));
    }

    Ok(Json(PresetDeleteResponse {
        success: true,
        message: "Modelo excluído com sucesso.".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/my/models/{model_id}/duplicate",
    tag = "presets",
    summary = "Duplicate preset",
    description = "Copy a preset under a new id; the copy's name gets a \" (cópia)\" suffix.",
    responses(
        (status = 201, description = "Copy created", body = PresetResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Preset not found or owned by someone else"),
        (status = 500, description = "Internal server error")
    ),
    params(("model_id" = uuid::Uuid, Path, description = "Preset ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn duplicate_preset(
    State(state): State<AppState>,
    Path(model_id): Path<PresetId>,
    current_user: CurrentUser,
) -> Result<(StatusCode, Json<PresetResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Presets::new(&mut pool_conn);

    let copy = repo.duplicate(current_user.id, model_id).await?.ok_or_else(|| not_found(model_id))?;
    Ok((StatusCode::CREATED, Json(PresetResponse::from(copy))))
}
