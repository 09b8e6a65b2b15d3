//! Direct model calls that do not persist anything: the structured drawing analysis
//! and the free-text PDF report (plus its connectivity check).

use axum::extract::State;
use serde_json::Value;

use crate::AppState;
use crate::api::extractors::Json;
use crate::analysis::{self, AnalysisResult, DrawingInput, ReportInput};
use crate::api::models::analyze::{AnalyzePdfRequest, AnalyzePdfResponse, AnalyzeRequest, ConnectionTestResponse};
use crate::api::models::tools::ToolResponse;
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Repository, Tools};
use crate::errors::{Error, Result};
use crate::types::UserId;

/// The caller's tool inventory as JSON, the default tool list handed to the model.
pub(crate) async fn inventory_json(state: &AppState, owner: UserId) -> Result<Value> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let tools: Vec<ToolResponse> = Tools::new(&mut pool_conn)
        .list(owner)
        .await?
        .into_iter()
        .map(ToolResponse::from)
        .collect();

    serde_json::to_value(tools).map_err(|e| Error::Internal {
        operation: format!("serialize tool inventory: {e}"),
    })
}

#[utoipa::path(
    post,
    path = "/analyze",
    tag = "analysis",
    summary = "Analyze drawing",
    description = "Ask the model for the machining features and a machining plan for a drawing image or its extracted text.",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Structured analysis", body = AnalysisResult),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Inference key not configured, or the model call failed")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %current_user.id))]
pub async fn analyze(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>> {
    let request = request.validate()?;
    state.inference.ensure_configured()?;

    let tools = match request.user_tools {
        Some(tools) => tools,
        None => inventory_json(&state, current_user.id).await?,
    };

    let result = analysis::analyze_drawing(
        &state.inference,
        &DrawingInput {
            image_url: request.image_url.as_deref(),
            text: request.text.as_deref(),
            material: &request.material,
            process: request.process,
            tools: &tools,
        },
    )
    .await?;

    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/analyze-pdf",
    tag = "analysis",
    summary = "Machining report for PDF text",
    request_body = AnalyzePdfRequest,
    responses(
        (status = 200, description = "Free-text report", body = AnalyzePdfResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Inference key not configured, or the model call failed")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %current_user.id))]
pub async fn analyze_pdf(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<AnalyzePdfRequest>,
) -> Result<Json<AnalyzePdfResponse>> {
    let output = analysis::report(
        &state.inference,
        &ReportInput {
            text: &request.text,
            material: &request.material,
            process: &request.process,
            tools: &request.tools,
        },
    )
    .await?;

    Ok(Json(AnalyzePdfResponse { success: true, output }))
}

#[utoipa::path(
    get,
    path = "/analyze-pdf",
    tag = "analysis",
    summary = "Test inference connectivity",
    responses(
        (status = 200, description = "The provider answered", body = ConnectionTestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Inference key not configured, or the model call failed")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %current_user.id))]
pub async fn test_connection(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ConnectionTestResponse>> {
    let test_response = analysis::connection_test(&state.inference).await?;

    Ok(Json(ConnectionTestResponse {
        success: true,
        message: "Conexão com DeepInfra estabelecida com sucesso!".to_string(),
        test_response,
        model: state.inference.model().to_string(),
    }))
}
