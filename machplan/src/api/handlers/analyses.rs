//! Persisted drawing analyses.
//!
//! `POST /api/analyses` is the full pipeline: store the uploaded drawing, record the
//! analysis as `processing`, run the model, and settle the row as `completed` or
//! `failed`. The remaining routes manage the stored rows.

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};
use chrono::Utc;
use metrics::counter;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::analysis::{self, AnalysisResult, DrawingInput};
use crate::api::extractors::{Json, Path};
use crate::api::handlers::analyze::inventory_json;
use crate::api::handlers::upload::{UploadedFile, read_upload_form};
use crate::api::models::analyses::{AnalysisResponse, AnalysisUpdate};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Analyses, Drawings, Repository};
use crate::db::models::analyses::{Analysis, AnalysisCreateDBRequest, AnalysisUpdateDBRequest, DrawingType, ProcessType};
use crate::db::models::drawings::{Drawing, DrawingCreateDBRequest};
use crate::errors::{Error, Result};
use crate::extraction::{classify, extract_pdf};
use crate::storage::drawing_key;
use crate::types::{AnalysisId, UserId, non_empty};

fn not_found(id: AnalysisId) -> Error {
    Error::NotFound {
        resource: "Analysis".to_string(),
        id: id.to_string(),
    }
}

fn bad_request(message: &str) -> Error {
    Error::BadRequest {
        message: message.to_string(),
    }
}

/// Title used when the upload does not name the analysis: the file name without its extension.
fn default_title(file_name: &str) -> String {
    FsPath::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(non_empty)
        .unwrap_or_else(|| file_name.to_string())
}

/// Store the blob, then its metadata row with the retention deadline.
async fn store_drawing(state: &AppState, owner: UserId, file: &UploadedFile) -> Result<Drawing> {
    let id = Uuid::new_v4();
    let storage_key = drawing_key(owner, id, &file.file_name);

    let expires_at = match state.config.storage.retention {
        Some(retention) => {
            let retention = chrono::Duration::from_std(retention).map_err(|e| Error::Internal {
                operation: format!("convert retention period: {e}"),
            })?;
            Some(Utc::now() + retention)
        }
        None => None,
    };

    state.storage.store(&storage_key, &file.content).await?;

    let request = DrawingCreateDBRequest {
        id,
        file_name: file.file_name.clone(),
        content_type: file.content_type.clone(),
        size_bytes: file.content.len() as i64,
        storage_key: storage_key.clone(),
        expires_at,
    };
    match insert_drawing(state, owner, &request).await {
        Ok(drawing) => Ok(drawing),
        Err(e) => {
            // Without its row the sweeper would never find this blob
            if let Err(cleanup) = state.storage.delete(&storage_key).await {
                error!(storage_key = %storage_key, "Failed to remove blob after insert error: {cleanup}");
            }
            Err(e)
        }
    }
}

async fn insert_drawing(state: &AppState, owner: UserId, request: &DrawingCreateDBRequest) -> Result<Drawing> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Drawings::new(&mut pool_conn).create(owner, request).await?)
}

/// URL under which the model provider can fetch a stored drawing, when a public
/// mirror of the storage directory is configured.
fn public_drawing_url(state: &AppState, drawing: &Drawing) -> Option<String> {
    let base = state.config.storage.public_base_url.as_ref()?;
    Some(format!("{}/{}", base.as_str().trim_end_matches('/'), drawing.storage_key))
}

/// Extract (for PDFs) and run the model.
async fn run_analysis(
    state: &AppState,
    owner: UserId,
    file: UploadedFile,
    drawing_type: DrawingType,
    drawing_url: Option<&str>,
    material: &str,
    process: ProcessType,
) -> Result<AnalysisResult> {
    let text = match drawing_type {
        DrawingType::Pdf => Some(extract_pdf(file.content).await?.text),
        DrawingType::Image | DrawingType::Cad => None,
    };
    if drawing_url.is_none() && text.is_none() {
        warn!("No public drawing URL configured; the model only sees the material and process");
    }

    let tools = inventory_json(state, owner).await?;
    analysis::analyze_drawing(
        &state.inference,
        &DrawingInput {
            image_url: drawing_url,
            text: text.as_deref(),
            material,
            process,
            tools: &tools,
        },
    )
    .await
}

/// What the detached half of `POST /api/analyses` needs once the row exists.
struct AnalysisJob {
    file: UploadedFile,
    drawing_type: DrawingType,
    drawing_url: Option<String>,
    material: String,
    process: ProcessType,
}

/// Run the model and settle the analysis as `completed` or `failed`.
async fn settle_analysis(state: AppState, owner: UserId, analysis_id: AnalysisId, job: AnalysisJob) -> Result<Analysis> {
    let outcome = run_analysis(
        &state,
        owner,
        job.file,
        job.drawing_type,
        job.drawing_url.as_deref(),
        &job.material,
        job.process,
    )
    .await
    .and_then(|result| {
        let features = serde_json::to_value(&result.features).map_err(|e| Error::Internal {
            operation: format!("serialize features: {e}"),
        })?;
        let plan = serde_json::to_value(&result.machining_plan).map_err(|e| Error::Internal {
            operation: format!("serialize machining plan: {e}"),
        })?;
        Ok((features, plan))
    });

    let error = match outcome {
        Ok((features, plan)) => match mark_completed(&state, owner, analysis_id, &features, &plan).await {
            Ok(completed) => {
                counter!("machplan_analyses_total", "status" => "completed").increment(1);
                info!(
                    analysis_id = %analysis_id,
                    features = features.as_array().map_or(0, Vec::len),
                    "Analysis completed"
                );
                return Ok(completed);
            }
            Err(error) => error,
        },
        Err(error) => error,
    };

    mark_failed(&state, owner, analysis_id, &error).await;
    Err(error)
}

async fn mark_completed(
    state: &AppState,
    owner: UserId,
    analysis_id: AnalysisId,
    features: &serde_json::Value,
    plan: &serde_json::Value,
) -> Result<Analysis> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Analyses::new(&mut pool_conn)
        .complete(owner, analysis_id, features, plan)
        .await?
        .ok_or_else(|| not_found(analysis_id))
}

/// Record the failure reason on the row. A failure to do so is logged; the caller
/// still reports the original error.
async fn mark_failed(state: &AppState, owner: UserId, analysis_id: AnalysisId, error: &Error) {
    let reason = match error {
        Error::Extraction { message } => format!("Erro ao processar PDF: {message}"),
        other => other.user_message(),
    };
    counter!("machplan_analyses_total", "status" => "failed").increment(1);
    warn!(analysis_id = %analysis_id, "Analysis failed: {reason}");

    let recorded = async {
        let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Analyses::new(&mut pool_conn).fail(owner, analysis_id, &reason).await?;
        Ok::<_, Error>(())
    }
    .await;
    if let Err(e) = recorded {
        error!(analysis_id = %analysis_id, "Could not record analysis failure: {e:#}");
    }
}

#[utoipa::path(
    get,
    path = "/analyses",
    tag = "analyses",
    summary = "List analyses",
    responses(
        (status = 200, description = "The caller's analyses, newest first", body = Vec<AnalysisResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_analyses(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<AnalysisResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Analyses::new(&mut pool_conn);

    let analyses = repo.list(current_user.id).await?;
    Ok(Json(analyses.into_iter().map(AnalysisResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/analyses",
    tag = "analyses",
    summary = "Upload and analyze a drawing",
    description = "Store the drawing, extract its text when it is a PDF, and ask the model for features and a \
                   machining plan based on the caller's tools. The analysis is persisted as `failed` when \
                   extraction or the model call fails.",
    request_body(
        content_type = "multipart/form-data",
        description = "`file` (PDF, image or CAD drawing), `material`, and optionally `title` and `processType` (milling, turning, complete)"
    ),
    responses(
        (status = 201, description = "Analysis completed", body = AnalysisResponse),
        (status = 400, description = "Missing file or material, unsupported file, or invalid process type"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Inference key not configured, extraction failed, or the model call failed")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %current_user.id))]
pub async fn create_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    let form = read_upload_form(&mut multipart, state.config.storage.max_upload_size).await?;

    let material = form
        .field("material")
        .and_then(non_empty)
        .ok_or_else(|| bad_request("Material é obrigatório."))?;
    let process = match form.field("processType").and_then(non_empty) {
        Some(process) => process
            .parse::<ProcessType>()
            .map_err(|_| bad_request("Tipo de processo inválido. Use milling, turning ou complete."))?,
        None => ProcessType::default(),
    };
    let title_field = form.field("title").and_then(non_empty);

    let file = form.file.ok_or_else(|| bad_request("Nenhum arquivo enviado."))?;
    let drawing_type = classify(&file.file_name, &file.content_type)
        .ok_or_else(|| bad_request("Formato de arquivo não suportado. Envie um PDF, imagem ou arquivo CAD."))?;
    let title = title_field.unwrap_or_else(|| default_title(&file.file_name));

    // Nothing is written unless the model can actually be called
    state.inference.ensure_configured()?;

    let drawing = store_drawing(&state, current_user.id, &file).await?;
    let drawing_url = public_drawing_url(&state, &drawing);

    let analysis = {
        let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Analyses::new(&mut pool_conn)
            .create(
                current_user.id,
                &AnalysisCreateDBRequest {
                    title,
                    drawing_id: Some(drawing.id),
                    drawing_url: drawing_url.clone(),
                    drawing_type,
                    material: material.clone(),
                    process_type: process,
                },
            )
            .await?
    };
    info!(analysis_id = %analysis.id, drawing_type = drawing_type.as_str(), "Analysis started");

    let job = AnalysisJob {
        file,
        drawing_type,
        drawing_url,
        material,
        process,
    };
    // Detached from the request: a client that disconnects mid-call still gets its row settled
    let pipeline = tokio::spawn(settle_analysis(state.clone(), current_user.id, analysis.id, job).in_current_span());
    let completed = pipeline.await.map_err(|e| Error::Internal {
        operation: format!("join analysis task: {e}"),
    })??;

    Ok((StatusCode::CREATED, Json(AnalysisResponse::from(completed))))
}

#[utoipa::path(
    get,
    path = "/analyses/{analysis_id}",
    tag = "analyses",
    summary = "Get analysis",
    responses(
        (status = 200, description = "Analysis details", body = AnalysisResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("analysis_id" = uuid::Uuid, Path, description = "Analysis ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<AnalysisId>,
    current_user: CurrentUser,
) -> Result<Json<AnalysisResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Analyses::new(&mut pool_conn);

    match repo.get_by_id(current_user.id, analysis_id).await? {
        Some(analysis) => Ok(Json(AnalysisResponse::from(analysis))),
        None => Err(not_found(analysis_id)),
    }
}

#[utoipa::path(
    patch,
    path = "/analyses/{analysis_id}",
    tag = "analyses",
    summary = "Rename analysis",
    request_body = AnalysisUpdate,
    responses(
        (status = 200, description = "Analysis updated", body = AnalysisResponse),
        (status = 400, description = "Title missing or blank"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("analysis_id" = uuid::Uuid, Path, description = "Analysis ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<AnalysisId>,
    current_user: CurrentUser,
    Json(update): Json<AnalysisUpdate>,
) -> Result<Json<AnalysisResponse>> {
    let title = update
        .title
        .as_deref()
        .and_then(non_empty)
        .ok_or_else(|| bad_request("Título é obrigatório."))?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Analyses::new(&mut pool_conn);

    if repo.get_by_id(current_user.id, analysis_id).await?.is_none() {
        return Err(not_found(analysis_id));
    }

    let analysis = repo
        .update(current_user.id, analysis_id, &AnalysisUpdateDBRequest { title })
        .await?
        .ok_or_else(|| not_found(analysis_id))?;
    Ok(Json(AnalysisResponse::from(analysis)))
}

#[utoipa::path(
    delete,
    path = "/analyses/{analysis_id}",
    tag = "analyses",
    summary = "Delete analysis",
    description = "Delete the analysis record. The stored drawing is left to the retention sweeper.",
    responses(
        (status = 204, description = "Analysis deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("analysis_id" = uuid::Uuid, Path, description = "Analysis ID")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<AnalysisId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Analyses::new(&mut pool_conn);

    if repo.delete(current_user.id, analysis_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(analysis_id))
    }
}
