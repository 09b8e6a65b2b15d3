//! API models for the direct analysis routes (`/api/analyze`, `/api/analyze-pdf`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::db::models::analyses::ProcessType;
use crate::errors::{Error, Result};
use crate::types::{non_empty, trimmed_opt};

/// Request body for a structured drawing analysis. At least one of `imageUrl` and
/// `text` must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[schema(example = "https://cdn.example.com/drawings/flange.png")]
    pub image_url: Option<String>,
    /// Text extracted from a PDF drawing
    pub text: Option<String>,
    #[schema(example = "Aço 1045")]
    pub material: Option<String>,
    #[schema(value_type = Option<ProcessType>)]
    pub process_type: Option<String>,
    /// Tools the model may pick from; defaults to the caller's inventory
    #[schema(value_type = Option<Vec<Object>>)]
    pub user_tools: Option<Value>,
}

/// An [`AnalyzeRequest`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidAnalyzeRequest {
    pub image_url: Option<String>,
    pub text: Option<String>,
    pub material: String,
    pub process: ProcessType,
    pub user_tools: Option<Value>,
}

impl AnalyzeRequest {
    pub fn validate(self) -> Result<ValidAnalyzeRequest> {
        let image_url = trimmed_opt(self.image_url.as_deref());
        let text = trimmed_opt(self.text.as_deref());
        if image_url.is_none() && text.is_none() {
            return Err(Error::BadRequest {
                message: "Envie a imagem (imageUrl) ou o texto (text) do desenho.".to_string(),
            });
        }

        let material = self.material.as_deref().and_then(non_empty).ok_or_else(|| Error::BadRequest {
            message: "Material é obrigatório.".to_string(),
        })?;

        let process = self
            .process_type
            .as_deref()
            .and_then(|p| p.parse::<ProcessType>().ok())
            .ok_or_else(|| Error::BadRequest {
                message: "Tipo de processo inválido. Use milling, turning ou complete.".to_string(),
            })?;

        Ok(ValidAnalyzeRequest {
            image_url,
            text,
            material,
            process,
            user_tools: self.user_tools.filter(|tools| !tools.is_null()),
        })
    }
}

/// Request body for a free-text PDF report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnalyzePdfRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub process: String,
    /// Embedded verbatim when a string, as JSON otherwise
    #[serde(default)]
    #[schema(value_type = Object)]
    pub tools: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzePdfResponse {
    pub success: bool,
    /// The model's report, `""` if it returned nothing
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResponse {
    pub success: bool,
    #[schema(example = "Conexão com DeepInfra estabelecida com sucesso!")]
    pub message: String,
    pub test_response: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> AnalyzeRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_request() {
        let valid = request(json!({
            "imageUrl": "https://cdn.example.com/a.png",
            "material": " Aço 1045 ",
            "processType": "turning",
            "userTools": [{"name": "Inserto CNMG"}]
        }))
        .validate()
        .unwrap();

        assert_eq!(valid.material, "Aço 1045");
        assert_eq!(valid.process, ProcessType::Turning);
        assert!(valid.text.is_none());
        assert!(valid.user_tools.is_some());
    }

    #[test]
    fn test_requires_image_or_text() {
        let err = request(json!({"material": "Aço", "processType": "milling"})).validate().unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn test_rejects_unknown_process() {
        let err = request(json!({"text": "Furo Ø8", "material": "Aço", "processType": "welding"}))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn test_requires_material() {
        let err = request(json!({"text": "Furo Ø8", "material": "  ", "processType": "complete"}))
            .validate()
            .unwrap_err();
        assert_eq!(err.user_message(), "Material é obrigatório.");
    }
}
