use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;
use crate::services::avatar_service::AvatarError;
use crate::services::email_service::EmailError;
use crate::validation::ValidationError;

/// Errors surfaced to HTTP clients. Anything internal collapses into
/// `Internal` and is logged, never echoed back.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_input() -> Self {
        ApiError::BadRequest("invalid input".to_string())
    }

    pub fn not_found() -> Self {
        ApiError::NotFound("not found".to_string())
    }

    pub fn not_authorized() -> Self {
        ApiError::Unauthorized("Not authorized".to_string())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let code = self.status_code().as_u16();
        match self {
            ApiError::BadRequest(status) | ApiError::NotFound(status) => json!({
                "status": status,
                "code": code,
            }),
            ApiError::Validation(err) => json!({
                "status": err.message,
                "code": code,
                "error": {
                    "field": err.field,
                    "constraint": err.constraint,
                },
            }),
            ApiError::Conflict(message) | ApiError::Unauthorized(message) => json!({
                "message": message,
                "code": code,
            }),
            ApiError::Internal(_) => json!({
                "message": "Internal server error",
                "code": code,
            }),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            log::error!("❌ {}", detail);
        }
        HttpResponse::build(self.status_code()).json(self.to_json())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::Conflict("Email is already in use".to_string()),
            StoreError::Database(e) => ApiError::Internal(format!("Database error: {}", e)),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AvatarError> for ApiError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::Decode(e) => ApiError::BadRequest(format!("unsupported image: {}", e)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
