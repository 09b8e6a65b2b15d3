//! Test utilities shared by the handler and integration tests.

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::PgPool;
use tempfile::TempDir;

use crate::AppState;
use crate::auth::session::SessionClaims;
use crate::config::Config;
use crate::db::handlers::{Repository, Tools};
use crate::db::models::tools::{Tool, ToolDBRequest, ToolType};
use crate::inference::InferenceClient;
use crate::storage::{DrawingStorage, LocalDrawingStorage};
use crate::types::UserId;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const TEST_MODEL: &str = "test/machplan-analysis-model";

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.auth.jwt_secret = Some(TEST_JWT_SECRET.to_string());
    config.database.pool.max_connections = 2;
    config.inference.model = TEST_MODEL.to_string();
    config.inference.timeout = std::time::Duration::from_secs(5);
    config.enable_file_logging = false;
    config.enable_metrics = false;
    config
}

/// App state over `pool` with storage in a fresh temporary directory. With
/// `inference_url`, the inference client points at that server and carries a key;
/// without it, the key is missing.
pub fn create_test_state(pool: PgPool, inference_url: Option<&str>) -> (AppState, TempDir) {
    let mut config = create_test_config();
    if let Some(url) = inference_url {
        config.inference.base_url = url.parse().expect("valid mock server URL");
        config.inference.api_key = Some("test-key".to_string());
    }
    create_test_state_with_config(pool, config)
}

pub fn create_test_state_with_config(pool: PgPool, mut config: Config) -> (AppState, TempDir) {
    // Several tests may race to install it; only the first call wins
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let dir = tempfile::tempdir().expect("Failed to create storage directory");
    config.storage.path = dir.path().to_path_buf();

    let inference = InferenceClient::new(&config.inference).expect("Failed to build inference client");
    let storage: Arc<dyn DrawingStorage> = Arc::new(LocalDrawingStorage::new(config.storage.path.clone()));

    let state = AppState::builder()
        .db(pool)
        .config(config)
        .inference(Arc::new(inference))
        .storage(storage)
        .build();

    (state, dir)
}

/// Test server over the full router. Keep the returned directory alive for the
/// duration of the test.
pub async fn create_test_app(pool: PgPool, inference_url: Option<&str>) -> (TestServer, TempDir) {
    let (state, dir) = create_test_state(pool, inference_url);
    let router = crate::build_router(&state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, dir)
}

/// An access token for `user_id`, signed the way the identity service signs them.
pub fn session_token(user_id: UserId) -> String {
    let claims = SessionClaims {
        sub: user_id,
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp(),
        iat: Some(Utc::now().timestamp()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes())).expect("Failed to sign test token")
}

/// `(name, value)` of an `Authorization` header for `user_id`.
pub fn auth_header(user_id: UserId) -> (String, String) {
    ("authorization".to_string(), format!("Bearer {}", session_token(user_id)))
}

pub async fn create_test_tool(pool: &PgPool, owner: UserId, name: &str, tool_type: ToolType) -> Tool {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Tools::new(&mut conn)
        .create(
            owner,
            &ToolDBRequest {
                name: name.to_string(),
                tool_type,
                material: Some("Metal duro".to_string()),
                diameter: Some(8.0),
                length: None,
                flutes: Some(2),
                coating: None,
                manufacturer: None,
                part_number: None,
                notes: None,
            },
        )
        .await
        .expect("Failed to create test tool")
}
