use axum::{
    Json,
    extract::{Multipart, State},
};

use crate::AppState;
use crate::api::handlers::upload::read_upload_form;
use crate::api::models::extraction::ExtractPdfResponse;
use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};
use crate::extraction::{extract_pdf, is_pdf};

#[utoipa::path(
    post,
    path = "/extract-pdf",
    tag = "extraction",
    summary = "Extract PDF text",
    description = "Extract the plain text and page count of an uploaded PDF drawing.",
    request_body(
        content_type = "multipart/form-data",
        description = "A `file` part holding the PDF"
    ),
    responses(
        (status = 200, description = "Extracted text", body = ExtractPdfResponse),
        (status = 400, description = "No file, or the file is not a PDF"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "The PDF could not be parsed")
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %current_user.id))]
pub async fn extract_pdf_text(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<ExtractPdfResponse>> {
    let form = read_upload_form(&mut multipart, state.config.storage.max_upload_size).await?;

    let file = form.file.ok_or_else(|| Error::BadRequest {
        message: "Nenhum arquivo enviado.".to_string(),
    })?;
    if !is_pdf(&file.content_type) {
        return Err(Error::BadRequest {
            message: "O arquivo enviado não é um PDF.".to_string(),
        });
    }

    let pdf = extract_pdf(file.content).await?;
    tracing::info!(pages = pdf.pages, "Extracted PDF text");
    Ok(Json(ExtractPdfResponse::from(pdf)))
}
