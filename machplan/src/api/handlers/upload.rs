//! Shared multipart parsing for drawing uploads.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};

use crate::errors::{Error, Result};
use crate::extraction::content_type_for;

/// The `file` part of an upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// Declared content type, or one guessed from the file name
    pub content_type: String,
    pub content: Bytes,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    /// Every other part, as text
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Human-readable upload limit: whole MB when exact, otherwise one decimal, and KB below 1 MB.
fn size_label(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes < MIB {
        format!("{} KB", bytes.div_ceil(1024))
    } else if bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

fn too_large(max_size: u64) -> Error {
    Error::PayloadTooLarge {
        message: format!("O arquivo excede o tamanho máximo de {}.", size_label(max_size)),
    }
}

/// Body-limit rejections surface as multipart errors; keep them as 413.
fn multipart_error(e: MultipartError, context: &str, max_size: u64) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max_size);
    }
    Error::BadRequest {
        message: format!("{context}: {e}"),
    }
}

/// Read a multipart upload, streaming the `file` part and aborting as soon as it
/// exceeds `max_size` bytes.
pub async fn read_upload_form(multipart: &mut Multipart, max_size: u64) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart data", max_size))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("drawing").to_string();
            let content_type = content_type_for(Some(&file_name), field.content_type());

            let mut content = BytesMut::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| multipart_error(e, "Failed to read file chunk", max_size))?
            {
                if (content.len() + chunk.len()) as u64 > max_size {
                    tracing::warn!(file_name = %file_name, max_size, "Upload size limit exceeded, aborting");
                    return Err(too_large(max_size));
                }
                content.extend_from_slice(&chunk);
            }

            tracing::debug!(file_name = %file_name, content_type = %content_type, size = content.len(), "Received upload");
            form.file = Some(UploadedFile {
                file_name,
                content_type,
                content: content.freeze(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, &format!("Failed to read field {name}"), max_size))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::size_label;

    #[test]
    fn test_size_label() {
        assert_eq!(size_label(20 * 1024 * 1024), "20 MB");
        assert_eq!(size_label(1024 * 1024), "1 MB");
        assert_eq!(size_label(1536 * 1024), "1.5 MB");
        assert_eq!(size_label(512 * 1024), "512 KB");
        assert_eq!(size_label(100), "1 KB");
    }
}
