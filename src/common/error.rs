// src/common/error.rs
//! API error envelope: every failed request renders `{"error", "code"}`

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::validation::ValidationResult;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid session
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid session without the paid claim
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// Wrong role for the operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    InternalServer(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("validation failed: {0}")]
    ValidationError(String),
}

/// JSON body of every error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServer(_) | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::PaymentRequired(_) => "PAYMENT_REQUIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServer(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let code = self.code();

        let message = match self {
            ApiError::DatabaseError(e) => {
                // Driver detail stays in the logs
                error!(error = %e, "Database error occurred");
                "Database operation failed".to_string()
            }
            ApiError::Unauthorized(msg)
            | ApiError::PaymentRequired(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServer(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::ValidationError(msg) => msg,
        };

        (status, Json(ErrorResponse { error: message, code })).into_response()
    }
}

/// Joins every failed rule into one `field: message` list
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        let messages: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        ApiError::ValidationError(messages.join(", "))
    }
}
