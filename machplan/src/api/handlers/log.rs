use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;
use crate::api::models::status::LogResponse;

/// Serve the server log file for diagnostics.
#[utoipa::path(
    get,
    path = "/log",
    tag = "status",
    summary = "Read server log",
    responses(
        (status = 200, description = "Log contents, or a notice when the log is missing or empty", body = LogResponse),
        (status = 500, description = "The log file could not be read")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn read_log(State(state): State<AppState>) -> Response {
    let log = match tokio::fs::read_to_string(&state.config.log_file).await {
        Ok(contents) if contents.is_empty() => "Arquivo de log vazio.".to_string(),
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => "Nenhum log encontrado.".to_string(),
        Err(e) => {
            tracing::error!(path = %state.config.log_file.display(), "Failed to read log file: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "log": "Erro ao ler arquivo de log.",
                })),
            )
                .into_response();
        }
    };

    Json(LogResponse { log }).into_response()
}

#[cfg(test)]
mod tests {
    use crate::build_router;
    use crate::test_utils::*;
    use axum_test::TestServer;
    use serde_json::json;
    use sqlx::PgPool;
    use std::path::Path;

    async fn server_with_log(pool: PgPool, log_file: &Path) -> TestServer {
        let mut config = create_test_config();
        config.log_file = log_file.to_path_buf();
        let (state, _dir) = create_test_state_with_config(pool, config);
        TestServer::new(build_router(&state).unwrap()).unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_log_states(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("server.log");
        let app = server_with_log(pool, &log_file).await;

        app.get("/api/log").await.assert_json(&json!({"log": "Nenhum log encontrado."}));

        std::fs::write(&log_file, "").unwrap();
        app.get("/api/log").await.assert_json(&json!({"log": "Arquivo de log vazio."}));

        std::fs::write(&log_file, "\n").unwrap();
        app.get("/api/log").await.assert_json(&json!({"log": "\n"}));

        std::fs::write(&log_file, "2025-03-01T10:00:00Z INFO machplan: Server listening\n").unwrap();
        let response = app.get("/api/log").await;
        response.assert_status_ok();
        response.assert_json(&json!({"log": "2025-03-01T10:00:00Z INFO machplan: Server listening\n"}));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unreadable_log(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file
        let app = server_with_log(pool, dir.path()).await;

        let response = app.get("/api/log").await;
        response.assert_status_internal_server_error();
        assert_eq!(response.json::<serde_json::Value>()["log"], "Erro ao ler arquivo de log.");
    }
}
