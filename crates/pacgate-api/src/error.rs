//! # API Error Types
//!
//! [`AppError`] implements `axum::response::IntoResponse` and is the only
//! error type route handlers return. Every response body has the shape
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "...", "details": [...]}}
//! ```
//!
//! `details` is only present for payload validation failures, where it lists
//! every `{field, message}` violation. Internal errors are logged and
//! replaced by a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pacgate_core::{PacgateError, ValidationErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field-level violations, present only for rejected payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Inbound document failed schema or mapping validation (400).
    #[error("document failed validation: {0}")]
    InvalidDocument(ValidationErrors),

    /// Request DTO violates a business rule (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or parameters could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credential (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// PAC credentials or environment are not usable (422).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Upstream service failure (502).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidDocument(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Configuration(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CONFIGURATION_ERROR"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::InvalidDocument(errors) => {
                format!("document failed validation ({} violation(s))", errors.len())
            }
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match &self {
            Self::InvalidDocument(errors) => serde_json::to_value(errors.violations()).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::InvalidDocument(errors)
    }
}

impl From<PacgateError> for AppError {
    fn from(err: PacgateError) -> Self {
        match err {
            PacgateError::Configuration(msg) => Self::Configuration(msg),
            PacgateError::Validation(errors) => Self::InvalidDocument(errors),
            err @ PacgateError::NotFound { .. } => Self::NotFound(err.to_string()),
            PacgateError::ExternalService(msg) => Self::Upstream(msg),
            PacgateError::Conflict(msg) => Self::Conflict(msg),
            PacgateError::Store(msg) => Self::Internal(msg),
            err @ PacgateError::OutcomeNotRecorded { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        PacgateError::from(err).into()
    }
}
