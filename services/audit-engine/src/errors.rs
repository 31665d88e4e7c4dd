use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;
use crate::screening::ScreeningError;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Screening service error: {0}")]
    Screening(#[from] ScreeningError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for AuditError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AuditError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuditError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuditError::Validation(_) => StatusCode::BAD_REQUEST,
            AuditError::Screening(ScreeningError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            AuditError::Screening(_) => StatusCode::BAD_GATEWAY,
            AuditError::Export(ExportError::NoTablesSelected) => StatusCode::BAD_REQUEST,
            AuditError::Export(ExportError::UnknownTable(_)) => StatusCode::BAD_REQUEST,
            AuditError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuditError::NotFound(_) => StatusCode::NOT_FOUND,
            AuditError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AuditError {
    fn error_type(&self) -> &str {
        match self {
            AuditError::Database(_) => "database_error",
            AuditError::Configuration(_) => "configuration_error",
            AuditError::Validation(_) => "validation_error",
            AuditError::Screening(_) => "screening_error",
            AuditError::Export(_) => "export_error",
            AuditError::NotFound(_) => "not_found",
            AuditError::Internal(_) => "internal_error",
        }
    }
}
