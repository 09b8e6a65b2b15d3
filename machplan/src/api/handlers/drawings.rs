//! Raw access to stored drawings.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::AppState;
use crate::api::extractors::Path;
use crate::api::models::users::CurrentUser;
use crate::db::handlers::Drawings;
use crate::errors::{Error, Result};
use crate::types::DrawingId;

fn not_found(id: DrawingId) -> Error {
    Error::NotFound {
        resource: "Drawing".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/drawings/{drawing_id}",
    tag = "drawings",
    summary = "Download drawing",
    responses(
        (status = 200, description = "The drawing bytes, with the content type recorded at upload", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Drawing not found, or already removed by retention"),
        (status = 500, description = "Internal server error")
    ),
    params(("drawing_id" = uuid::Uuid, Path, description = "Drawing ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_drawing(
    State(state): State<AppState>,
    Path(drawing_id): Path<DrawingId>,
    current_user: CurrentUser,
) -> Result<impl IntoResponse> {
    let drawing = {
        let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Drawings::new(&mut pool_conn)
            .get_by_id(current_user.id, drawing_id)
            .await?
            .ok_or_else(|| not_found(drawing_id))?
    };

    let content = state.storage.retrieve(&drawing.storage_key).await?;
    let disposition = format!("inline; filename=\"{}\"", drawing.file_name.replace('"', ""));

    Ok((
        [(header::CONTENT_TYPE, drawing.content_type), (header::CONTENT_DISPOSITION, disposition)],
        content,
    ))
}

#[utoipa::path(
    delete,
    path = "/drawings/{drawing_id}",
    tag = "drawings",
    summary = "Delete drawing",
    description = "Remove the drawing before its retention deadline. Analyses that used it keep their results.",
    responses(
        (status = 204, description = "Drawing deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Drawing not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("drawing_id" = uuid::Uuid, Path, description = "Drawing ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_drawing(
    State(state): State<AppState>,
    Path(drawing_id): Path<DrawingId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Drawings::new(&mut pool_conn);

    let drawing = repo
        .get_by_id(current_user.id, drawing_id)
        .await?
        .ok_or_else(|| not_found(drawing_id))?;

    // Blob first: if it cannot be removed the row stays and the sweeper retries later
    state.storage.delete(&drawing.storage_key).await?;
    repo.delete(current_user.id, drawing_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::analyses::AnalysisResponse;
    use crate::test_utils::*;
    use axum::http::{StatusCode, header};
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use uuid::Uuid;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

    async fn uploaded_image(app: &axum_test::TestServer, auth: &(String, String)) -> Uuid {
        let form = MultipartForm::new()
            .add_part("file", Part::bytes(PNG.to_vec()).file_name("suporte.png").mime_type("image/png"))
            .add_text("material", "Aço 1020");
        let analysis: AnalysisResponse = app.post("/api/analyses").add_header(&auth.0, &auth.1).multipart(form).await.json();
        analysis.drawing_id.unwrap()
    }

    async fn mock_model() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"features\": [], \"machining_plan\": {}}"}}]
            })))
            .mount(&server)
            .await;
        server
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_download_returns_stored_bytes(pool: PgPool) {
        let server = mock_model().await;
        let (app, _dir) = create_test_app(pool, Some(&server.uri())).await;
        let auth = auth_header(Uuid::new_v4());

        let drawing_id = uploaded_image(&app, &auth).await;

        let response = app.get(&format!("/api/drawings/{drawing_id}")).add_header(&auth.0, &auth.1).await;
        response.assert_status_ok();
        response.assert_header(header::CONTENT_TYPE, "image/png");
        assert_eq!(response.as_bytes().as_ref(), PNG);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_removes_drawing_but_keeps_analysis(pool: PgPool) {
        let server = mock_model().await;
        let (app, _dir) = create_test_app(pool, Some(&server.uri())).await;
        let owner = auth_header(Uuid::new_v4());
        let intruder = auth_header(Uuid::new_v4());

        let drawing_id = uploaded_image(&app, &owner).await;
        let url = format!("/api/drawings/{drawing_id}");

        app.get(&url).add_header(&intruder.0, &intruder.1).await.assert_status_not_found();
        app.delete(&url).add_header(&intruder.0, &intruder.1).await.assert_status_not_found();

        app.delete(&url).add_header(&owner.0, &owner.1).await.assert_status(StatusCode::NO_CONTENT);
        let response = app.get(&url).add_header(&owner.0, &owner.1).await;
        response.assert_status_not_found();
        assert_eq!(response.json::<Value>()["error"], "Desenho não encontrado.");

        let analyses: Vec<AnalysisResponse> = app.get("/api/analyses").add_header(&owner.0, &owner.1).await.json();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].drawing_id, None);
    }
}
