//! Drawing intake: content-type detection, drawing classification and PDF text extraction.

use bytes::Bytes;
use lopdf::Document;
use tracing::{instrument, warn};

use crate::db::models::analyses::DrawingType;
use crate::errors::{Error, Result};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const CAD_EXTENSIONS: &[&str] = &["dxf", "dwg", "step", "stp", "igs", "iges"];

/// Text pulled out of a PDF drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfText {
    /// Page texts in page order, joined with newlines
    pub text: String,
    pub pages: usize,
}

/// Effective content type of an upload: the declared one unless it is missing or
/// generic, otherwise a guess from the file name.
pub fn content_type_for(file_name: Option<&str>, declared: Option<&str>) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => file_name
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

pub fn is_pdf(content_type: &str) -> bool {
    content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE)
}

/// Classify an upload as a drawing, or `None` when it is not something we can analyse.
pub fn classify(file_name: &str, content_type: &str) -> Option<DrawingType> {
    if is_pdf(content_type) {
        return Some(DrawingType::Pdf);
    }
    if content_type.starts_with("image/") {
        return Some(DrawingType::Image);
    }

    let ext = std::path::Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    CAD_EXTENSIONS.contains(&ext.as_str()).then_some(DrawingType::Cad)
}

/// Extract plain text and the page count from a PDF.
///
/// Parsing runs on the blocking pool. A document that cannot be loaded is an
/// [`Error::Extraction`]; a single page whose text cannot be decoded contributes an
/// empty string.
#[instrument(skip(content), fields(size = content.len()), err)]
pub async fn extract_pdf(content: Bytes) -> Result<PdfText> {
    tokio::task::spawn_blocking(move || extract_pdf_blocking(&content))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join PDF extraction task: {e}"),
        })?
}

fn extract_pdf_blocking(content: &[u8]) -> Result<PdfText> {
    let document = Document::load_mem(content).map_err(|e| Error::Extraction { message: e.to_string() })?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    let texts: Vec<String> = page_numbers
        .iter()
        .map(|&page| {
            document.extract_text(&[page]).unwrap_or_else(|e| {
                warn!(page, "Failed to decode text on PDF page: {e}");
                String::new()
            })
        })
        .map(|text| text.trim().to_string())
        .collect();

    Ok(PdfText {
        text: texts.join("\n"),
        pages: page_numbers.len(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a PDF with one page per entry, each showing the given line of text.
    pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_extract_text_and_page_count() {
        let pdf = build_pdf(&["Shaft 25h7 length 120", "Thread M8x1.25"]);

        let extracted = extract_pdf(Bytes::from(pdf)).await.unwrap();
        assert_eq!(extracted.pages, 2);
        assert!(extracted.text.contains("Shaft 25h7"), "got {:?}", extracted.text);
        assert!(extracted.text.contains("M8x1.25"), "got {:?}", extracted.text);

        let shaft = extracted.text.find("Shaft").unwrap();
        let thread = extracted.text.find("Thread").unwrap();
        assert!(shaft < thread, "pages must stay in order");
    }

    #[tokio::test]
    async fn test_garbage_is_an_extraction_error() {
        let result = extract_pdf(Bytes::from_static(b"definitely not a pdf")).await;
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(content_type_for(Some("a.pdf"), None), "application/pdf");
        assert_eq!(content_type_for(Some("a.pdf"), Some("application/octet-stream")), "application/pdf");
        assert_eq!(content_type_for(Some("a.png"), Some("image/png")), "image/png");
        assert_eq!(content_type_for(Some("a.txt"), Some("text/plain")), "text/plain");
        assert_eq!(content_type_for(None, None), "application/octet-stream");
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify("a.pdf", "application/pdf"), Some(DrawingType::Pdf));
        assert_eq!(classify("a.jpg", "image/jpeg"), Some(DrawingType::Image));
        assert_eq!(classify("part.STEP", "application/octet-stream"), Some(DrawingType::Cad));
        assert_eq!(classify("notes.txt", "text/plain"), None);
    }
}
