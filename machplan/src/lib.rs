//! # machplan: drawing analysis and machining plans for CNC shops
//!
//! `machplan` is the backend behind the MachPlan dashboard. Users upload technical
//! drawings (PDFs, images, CAD files); the service extracts what it can, asks a hosted
//! language model for the machining features in the drawing and a machining plan that
//! uses the shop's own tools, and stores the result next to the shop's inventory of
//! machines, tools and cutting parameters.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum); all persistence is
//! PostgreSQL through `sqlx`. Users are managed by an external identity service: this
//! crate only verifies the access tokens it issues, and every row is scoped to the
//! token's subject.
//!
//! ### Core Components
//!
//! - **API layer** ([`api`]): JSON routes under `/api`, one handler module per resource.
//! - **Authentication** ([`auth`]): the [`CurrentUser`](api::models::users::CurrentUser)
//!   extractor (bearer token, session cookie, or trusted proxy header).
//! - **Database layer** ([`db`]): owner-scoped repositories over `&mut PgConnection`.
//! - **Extraction** ([`extraction`]): drawing classification and PDF text extraction.
//! - **Inference** ([`inference`], [`analysis`]): the chat-completion client, prompt
//!   templates and reply parsing.
//! - **Storage and retention** ([`storage`], [`retention`]): drawing blobs on disk and
//!   the background sweeper that deletes them once their retention period ends.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use machplan::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = machplan::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     machplan::telemetry::init_telemetry(&config)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extraction;
pub mod inference;
mod openapi;
pub mod retention;
pub mod storage;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::handlers;
use crate::config::CorsOrigin;
use crate::inference::InferenceClient;
use crate::openapi::ApiDoc;
use crate::storage::{DrawingStorage, LocalDrawingStorage};

pub use config::Config;
pub use types::{AnalysisId, CuttingParameterId, DrawingId, MachineId, PresetId, ToolId, UserId};

/// Headroom on top of `storage.max_upload_size` for the other multipart fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// - `db`: PostgreSQL connection pool
/// - `config`: application configuration
/// - `inference`: chat-completion client for the configured provider
/// - `storage`: drawing blob storage
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .inference(Arc::new(InferenceClient::new(&config.inference)?))
///     .storage(Arc::new(LocalDrawingStorage::new(config.storage.path.clone())))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub inference: Arc<InferenceClient>,
    pub storage: Arc<dyn DrawingStorage>,
}

/// Get the machplan database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL with the configured pool settings and run migrations.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    let pool = options.connect(&config.database.url).await?;
    migrator().run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            // Browsers send origins without a trailing slash
            CorsOrigin::Url(url) => url.origin().ascii_serialization().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/api/*`: the JSON API (see [`api::handlers`])
/// - `/api/openapi.json` and `/api/docs`: API documentation
/// - `/healthz`: liveness
/// - `/internal/metrics`: Prometheus metrics, when `enable_metrics` is set
///
/// CORS and request tracing wrap everything.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_limit = DefaultBodyLimit::max(state.config.storage.max_upload_size as usize + MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        // Extraction and direct analysis
        .route("/extract-pdf", post(handlers::extraction::extract_pdf_text).layer(upload_limit.clone()))
        .route("/analyze", post(handlers::analyze::analyze))
        .route(
            "/analyze-pdf",
            post(handlers::analyze::analyze_pdf).get(handlers::analyze::test_connection),
        )
        // Persisted analyses and their drawings
        .route(
            "/analyses",
            get(handlers::analyses::list_analyses).post(handlers::analyses::create_analysis).layer(upload_limit),
        )
        .route(
            "/analyses/{id}",
            get(handlers::analyses::get_analysis)
                .patch(handlers::analyses::update_analysis)
                .delete(handlers::analyses::delete_analysis),
        )
        .route(
            "/drawings/{id}",
            get(handlers::drawings::get_drawing).delete(handlers::drawings::delete_drawing),
        )
        // Shop inventory
        .route("/machines", get(handlers::machines::list_machines).post(handlers::machines::create_machine))
        .route(
            "/machines/{id}",
            get(handlers::machines::get_machine)
                .put(handlers::machines::update_machine)
                .delete(handlers::machines::delete_machine),
        )
        .route("/tools", get(handlers::tools::list_tools).post(handlers::tools::create_tool))
        .route(
            "/tools/{id}",
            get(handlers::tools::get_tool)
                .put(handlers::tools::update_tool)
                .delete(handlers::tools::delete_tool),
        )
        .route(
            "/cutting-parameters",
            get(handlers::cutting_parameters::list_cutting_parameters).post(handlers::cutting_parameters::create_cutting_parameter),
        )
        .route(
            "/cutting-parameters/{id}",
            get(handlers::cutting_parameters::get_cutting_parameter)
                .put(handlers::cutting_parameters::update_cutting_parameter)
                .delete(handlers::cutting_parameters::delete_cutting_parameter),
        )
        // Presets
        .route("/my/models", get(handlers::presets::list_presets).post(handlers::presets::create_preset))
        .route(
            "/my/models/{id}",
            get(handlers::presets::get_preset)
                .patch(handlers::presets::update_preset)
                .delete(handlers::presets::delete_preset),
        )
        .route("/my/models/{id}/duplicate", post(handlers::presets::duplicate_preset))
        // Unauthenticated diagnostics
        .route("/models", get(handlers::models_stub::models_status).post(handlers::models_stub::models_echo))
        .route("/log", get(handlers::log::read_log))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Background tasks running alongside the HTTP server (currently the retention
/// sweeper).
///
/// [`shutdown`](BackgroundServices::shutdown) cancels the shared token and waits for
/// every task. Dropping the struct cancels the token through `drop_guard`.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

fn setup_background_services(state: &AppState, shutdown_token: CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    if state.config.storage.retention.is_some() {
        let pool = state.db.clone();
        let storage = state.storage.clone();
        let interval = state.config.storage.sweep_interval;
        let shutdown = shutdown_token.clone();

        let handle = tokio::spawn(async move {
            info!(interval = ?interval, "Starting drawing retention sweeper");
            if let Err(e) = retention::run_sweeper(pool, storage, interval, shutdown).await {
                tracing::error!("Retention sweeper error: {:#}", e);
            }
        });
        background_tasks.push(handle);
    } else {
        info!("Drawing retention disabled; drawings are kept until deleted");
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. [`Application::new`] connects to the database, runs migrations, builds the
///    inference client and drawing storage, and starts background services
/// 2. [`Application::serve`] binds the listener and handles requests until the
///    shutdown future resolves, then stops background services and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting machplan with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;

        let inference = InferenceClient::new(&config.inference)?;
        if !inference.is_configured() {
            warn!("{} is not set; analysis routes will answer with a configuration error", config::INFERENCE_API_KEY_VAR);
        }

        tokio::fs::create_dir_all(&config.storage.path).await?;
        let storage: Arc<dyn DrawingStorage> = Arc::new(LocalDrawingStorage::new(config.storage.path.clone()));

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .inference(Arc::new(inference))
            .storage(storage)
            .build();

        let router = build_router(&app_state)?;
        let bg_services = setup_background_services(&app_state, CancellationToken::new());

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "MachPlan listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::*;
    use sqlx::ConnectOptions;
    use uuid::Uuid;

    #[sqlx::test]
    async fn test_application_integration(pool: PgPool) {
        let storage_dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.database.url = pool.connect_options().to_url_lossy().to_string();
        config.storage.path = storage_dir.path().join("drawings");

        let app = Application::new(config).await;
        assert!(app.is_ok(), "Application::new should succeed");

        let (server, bg_services) = app.unwrap().into_test_server();

        let health_response = server.get("/healthz").await;
        health_response.assert_status_ok();
        assert_eq!(health_response.text(), "OK");

        let openapi_response = server.get("/api/openapi.json").await;
        openapi_response.assert_status_ok();
        assert!(openapi_response.text().contains("/my/models"));

        let api_response = server.get("/api/machines").await;
        api_response.assert_status_unauthorized();
        api_response.assert_json(&serde_json::json!({"error": errors::UNAUTHENTICATED_MESSAGE}));

        let auth = auth_header(Uuid::new_v4());
        server.get("/api/machines").add_header(&auth.0, &auth.1).await.assert_status_ok();

        bg_services.shutdown().await;
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_disabled(pool: PgPool) {
        let (state, _dir) = create_test_state(pool, None);
        let router = build_router(&state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        server.get("/internal/metrics").await.assert_status_not_found();
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_enabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = true;
        let (state, _dir) = create_test_state_with_config(pool, config);

        let router = build_router(&state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        server.get("/healthz").await.assert_status_ok();
        let metrics_response = server.get("/internal/metrics").await;
        metrics_response.assert_status_ok();

        let metrics_content = metrics_response.text();
        assert!(metrics_content.contains("# HELP") || metrics_content.contains("# TYPE"));
    }

    #[sqlx::test]
    async fn test_cors_preflight_allows_configured_origin(pool: PgPool) {
        let (state, _dir) = create_test_state(pool, None);
        let server = axum_test::TestServer::new(build_router(&state).unwrap()).unwrap();

        let response = server
            .method(http::Method::OPTIONS, "/api/machines")
            .add_header("origin", "http://localhost:3000")
            .add_header("access-control-request-method", "POST")
            .await;
        response.assert_header("access-control-allow-origin", "http://localhost:3000");
    }
}
