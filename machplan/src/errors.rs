use crate::db::errors::DbError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Message shown to callers without valid credentials.
pub const UNAUTHENTICATED_MESSAGE: &str = "Não autorizado. Faça login para continuar.";

/// Message shown for any failure whose details must not leak.
pub const INTERNAL_MESSAGE: &str = "Erro interno do servidor.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Upload exceeds the configured size limit
    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    /// Requested resource not found, or owned by someone else
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// A required secret (e.g. the inference API key) is missing from configuration
    #[error("{variable} is not configured")]
    NotConfigured { variable: String },

    /// The inference provider returned an error or an unusable reply
    #[error("Upstream error: {message}")]
    Upstream { message: String, details: serde_json::Value },

    /// A drawing could not be parsed
    #[error("Failed to extract drawing: {message}")]
    Extraction { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::NotConfigured { .. } | Error::Upstream { .. } | Error::Extraction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| UNAUTHENTICATED_MESSAGE.to_string()),
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::NotFound { resource, .. } => not_found_message(resource).to_string(),
            Error::NotConfigured { variable } => format!("{variable} não configurada."),
            Error::Upstream { message, .. } => message.clone(),
            Error::Extraction { .. } => "Erro ao processar PDF".to_string(),
            Error::Internal { .. } => INTERNAL_MESSAGE.to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Recurso não encontrado.".to_string(),
                DbError::UniqueViolation { .. } => "Registro já existe.".to_string(),
                DbError::ForeignKeyViolation { .. } => "Referência inválida a outro registro.".to_string(),
                DbError::CheckViolation { .. } => "Dados inválidos.".to_string(),
                DbError::Other(_) => INTERNAL_MESSAGE.to_string(),
            },
            Error::Other(_) => INTERNAL_MESSAGE.to_string(),
        }
    }
}

/// Caller-facing not-found message per resource kind.
fn not_found_message(resource: &str) -> &'static str {
    match resource {
        "Model" => "Modelo não encontrado ou você não tem permissão.",
        "Machine" => "Máquina não encontrada.",
        "Tool" => "Ferramenta não encontrada.",
        "CuttingParameter" => "Parâmetro de corte não encontrado.",
        "Analysis" => "Análise não encontrada.",
        "Drawing" => "Desenho não encontrado.",
        _ => "Recurso não encontrado.",
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::NotConfigured { .. } => {
                tracing::error!("Configuration error: {}", self);
            }
            Error::Upstream { .. } | Error::Extraction { .. } => {
                tracing::warn!("Processing error: {}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        let body = match &self {
            Error::Upstream { message, details } => json!({
                "success": false,
                "error": message,
                "details": details,
            }),
            Error::Extraction { message } => json!({
                "error": self.user_message(),
                "details": message,
            }),
            _ => json!({ "error": self.user_message() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest {
            message: format!("Dados inválidos: {}", rejection.body_text()),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(_) => Error::BadRequest {
                message: "Identificador inválido.".to_string(),
            },
            other => Error::Internal {
                operation: format!("extract path parameters: {}", other.body_text()),
            },
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_message() {
        let err = Error::NotConfigured {
            variable: "DEEPINFRA_API_KEY".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "DEEPINFRA_API_KEY não configurada.");
    }

    #[test]
    fn test_unauthenticated_defaults_to_login_message() {
        let err = Error::Unauthenticated { message: None };
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), UNAUTHENTICATED_MESSAGE);
    }

    #[test]
    fn test_preset_not_found_message() {
        let err = Error::NotFound {
            resource: "Model".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Modelo não encontrado ou você não tem permissão.");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = Error::Other(anyhow::anyhow!("connection string postgres://secret"));
        assert_eq!(err.user_message(), INTERNAL_MESSAGE);

        let err = Error::Database(DbError::Other(anyhow::anyhow!("boom")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), INTERNAL_MESSAGE);
    }
}
