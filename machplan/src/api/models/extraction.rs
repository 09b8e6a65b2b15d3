//! API models for PDF text extraction.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::extraction::PdfText;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractPdfResponse {
    pub success: bool,
    /// Page texts in page order, joined with newlines
    pub text: String,
    pub pages: usize,
}

impl From<PdfText> for ExtractPdfResponse {
    fn from(pdf: PdfText) -> Self {
        Self {
            success: true,
            text: pdf.text,
            pages: pdf.pages,
        }
    }
}
