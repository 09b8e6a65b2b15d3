use axum::{extract::State, http::StatusCode};

use crate::AppState;
use crate::api::extractors::{Json, Path};
use crate::api::models::machines::{MachineRequest, MachineResponse};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Machines, Repository};
use crate::db::models::machines::MachineDBRequest;
use crate::errors::{Error, Result};
use crate::types::MachineId;

fn not_found(id: MachineId) -> Error {
    Error::NotFound {
        resource: "Machine".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/machines",
    tag = "machines",
    summary = "List machines",
    responses(
        (status = 200, description = "The caller's machines, newest first", body = Vec<MachineResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_machines(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<MachineResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Machines::new(&mut pool_conn);

    let machines = repo.list(current_user.id).await?;
    Ok(Json(machines.into_iter().map(MachineResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/machines",
    tag = "machines",
    summary = "Create machine",
    request_body = MachineRequest,
    responses(
        (status = 201, description = "Machine created", body = MachineResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<MachineRequest>,
) -> Result<(StatusCode, Json<MachineResponse>)> {
    let request = MachineDBRequest::try_from(create)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Machines::new(&mut pool_conn);

    let machine = repo.create(current_user.id, &request).await?;
    Ok((StatusCode::CREATED, Json(MachineResponse::from(machine))))
}

#[utoipa::path(
    get,
    path = "/machines/{machine_id}",
    tag = "machines",
    summary = "Get machine",
    responses(
        (status = 200, description = "Machine details", body = MachineResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Machine not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("machine_id" = uuid::Uuid, Path, description = "Machine ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
    current_user: CurrentUser,
) -> Result<Json<MachineResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Machines::new(&mut pool_conn);

    match repo.get_by_id(current_user.id, machine_id).await? {
        Some(machine) => Ok(Json(MachineResponse::from(machine))),
        None => Err(not_found(machine_id)),
    }
}

#[utoipa::path(
    put,
    path = "/machines/{machine_id}",
    tag = "machines",
    summary = "Replace machine",
    request_body = MachineRequest,
    responses(
        (status = 200, description = "Machine updated", body = MachineResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Machine not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("machine_id" = uuid::Uuid, Path, description = "Machine ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
    current_user: CurrentUser,
    Json(update): Json<MachineRequest>,
) -> Result<Json<MachineResponse>> {
    let request = MachineDBRequest::try_from(update)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Machines::new(&mut pool_conn);

    if repo.get_by_id(current_user.id, machine_id).await?.is_none() {
        return Err(not_found(machine_id));
    }

    let machine = repo
        .update(current_user.id, machine_id, &request)
        .await?
        .ok_or_else(|| not_found(machine_id))?;
    Ok(Json(MachineResponse::from(machine)))
}

#[utoipa::path(
    delete,
    path = "/machines/{machine_id}",
    tag = "machines",
    summary = "Delete machine",
    responses(
        (status = 204, description = "Machine deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Machine not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("machine_id" = uuid::Uuid, Path, description = "Machine ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Machines::new(&mut pool_conn);

    if repo.delete(current_user.id, machine_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(machine_id))
    }
}
