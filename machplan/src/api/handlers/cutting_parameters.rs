use axum::{extract::State, http::StatusCode};

use crate::AppState;
use crate::api::extractors::{Json, Path};
use crate::api::models::cutting_parameters::{CuttingParameterRequest, CuttingParameterResponse};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{CuttingParameters, Repository};
use crate::db::models::cutting_parameters::CuttingParameterDBRequest;
use crate::errors::{Error, Result};
use crate::types::CuttingParameterId;

fn not_found(id: CuttingParameterId) -> Error {
    Error::NotFound {
        resource: "CuttingParameter".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/cutting-parameters",
    tag = "cutting-parameters",
    summary = "List cutting parameters",
    responses(
        (status = 200, description = "The caller's cutting parameters, newest first", body = Vec<CuttingParameterResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_cutting_parameters(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<CuttingParameterResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = CuttingParameters::new(&mut pool_conn);

    let parameters = repo.list(current_user.id).await?;
    Ok(Json(parameters.into_iter().map(CuttingParameterResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/cutting-parameters",
    tag = "cutting-parameters",
    summary = "Create cutting parameter",
    request_body = CuttingParameterRequest,
    responses(
        (status = 201, description = "Cutting parameter created", body = CuttingParameterResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_cutting_parameter(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<CuttingParameterRequest>,
) -> Result<(StatusCode, Json<CuttingParameterResponse>)> {
    let request = CuttingParameterDBRequest::try_from(create)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = CuttingParameters::new(&mut pool_conn);

    let parameter = repo.create(current_user.id, &request).await?;
    Ok((StatusCode::CREATED, Json(CuttingParameterResponse::from(parameter))))
}

#[utoipa::path(
    get,
    path = "/cutting-parameters/{parameter_id}",
    tag = "cutting-parameters",
    summary = "Get cutting parameter",
    responses(
        (status = 200, description = "Cutting parameter details", body = CuttingParameterResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Cutting parameter not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("parameter_id" = uuid::Uuid, Path, description = "Cutting parameter ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_cutting_parameter(
    State(state): State<AppState>,
    Path(parameter_id): Path<CuttingParameterId>,
    current_user: CurrentUser,
) -> Result<Json<CuttingParameterResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = CuttingParameters::new(&mut pool_conn);

    match repo.get_by_id(current_user.id, parameter_id).await? {
        Some(parameter) => Ok(Json(CuttingParameterResponse::from(parameter))),
        None => Err(not_found(parameter_id)),
    }
}

#[utoipa::path(
    put,
    path = "/cutting-parameters/{parameter_id}",
    tag = "cutting-parameters",
    summary = "Replace cutting parameter",
    request_body = CuttingParameterRequest,
    responses(
        (status = 200, description = "Cutting parameter updated", body = CuttingParameterResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Cutting parameter not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("parameter_id" = uuid::Uuid, Path, description = "Cutting parameter ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_cutting_parameter(
    State(state): State<AppState>,
    Path(parameter_id): Path<CuttingParameterId>,
    current_user: CurrentUser,
    Json(update): Json<CuttingParameterRequest>,
) -> Result<Json<CuttingParameterResponse>> {
    let request = CuttingParameterDBRequest::try_from(update)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = CuttingParameters::new(&mut pool_conn);

    if repo.get_by_id(current_user.id, parameter_id).await?.is_none() {
        return Err(not_found(parameter_id));
    }

    let parameter = repo
        .update(current_user.id, parameter_id, &request)
        .await?
        .ok_or_else(|| not_found(parameter_id))?;
    Ok(Json(CuttingParameterResponse::from(parameter)))
}

#[utoipa::path(
    delete,
    path = "/cutting-parameters/{parameter_id}",
    tag = "cutting-parameters",
    summary = "Delete cutting parameter",
    responses(
        (status = 204, description = "Cutting parameter deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Cutting parameter not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("parameter_id" = uuid::Uuid, Path, description = "Cutting parameter ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_cutting_parameter(
    State(state): State<AppState>,
    Path(parameter_id): Path<CuttingParameterId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = CuttingParameters::new(&mut pool_conn);

    if repo.delete(current_user.id, parameter_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(parameter_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::cutting_parameters::CuttingParameterResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_cutting_parameter_lifecycle(pool: PgPool) {
        let (app, _dir) = create_test_app(pool, None).await;
        let auth = auth_header(Uuid::new_v4());

        let response = app
            .post("/api/cutting-parameters")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"material": "Alumínio 6061", "tool_type": "end_mill", "rpm": 12000, "ap": 1.5, "ae": 4.0}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let parameter: CuttingParameterResponse = response.json();
        assert_eq!(parameter.rpm, Some(12000));

        let response = app
            .put(&format!("/api/cutting-parameters/{}", parameter.id))
            .add_header(&auth.0, &auth.1)
            .json(&json!({"material": "Alumínio 6061", "tool_type": "end_mill", "rpm": 9000}))
            .await;
        response.assert_status_ok();
        let updated: CuttingParameterResponse = response.json();
        assert_eq!(updated.rpm, Some(9000));
        assert_eq!(updated.ap, None);

        app.delete(&format!("/api/cutting-parameters/{}", parameter.id))
            .add_header(&auth.0, &auth.1)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let remaining: Vec<CuttingParameterResponse> = app.get("/api/cutting-parameters").add_header(&auth.0, &auth.1).await.json();
        assert!(remaining.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_material_and_tool_type_are_required(pool: PgPool) {
        let (app, _dir) = create_test_app(pool, None).await;
        let auth = auth_header(Uuid::new_v4());

        let response = app
            .post("/api/cutting-parameters")
            .add_header(&auth.0, &auth.1)
            .json(&json!({"material": "Aço 1045"}))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<serde_json::Value>()["error"], "Tipo de ferramenta é obrigatório.");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_foreign_parameter_cannot_be_deleted(pool: PgPool) {
        let (app, _dir) = create_test_app(pool, None).await;
        let owner = auth_header(Uuid::new_v4());
        let intruder = auth_header(Uuid::new_v4());

        let parameter: CuttingParameterResponse = app
            .post("/api/cutting-parameters")
            .add_header(&owner.0, &owner.1)
            .json(&json!({"material": "Inox 304", "tool_type": "drill"}))
            .await
            .json();

        let response = app
            .delete(&format!("/api/cutting-parameters/{}", parameter.id))
            .add_header(&intruder.0, &intruder.1)
            .await;
        response.assert_status_not_found();
        assert_eq!(response.json::<serde_json::Value>()["error"], "Parâmetro de corte não encontrado.");
    }
}
