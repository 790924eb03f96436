//! # Custom Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs and helpers that turn axum
//! rejections into [`AppError`]s with the standard error body.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use pacgate_core::{DocumentId, ValidationErrors};
use uuid::Uuid;

use crate::error::AppError;

/// Business rules a request DTO checks beyond what serde enforces.
pub trait Validate {
    /// Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract an inbound fiscal document body.
///
/// Unparseable JSON is reported the same way as a schema violation: a 400
/// with one root-level entry in `details`.
pub fn extract_document_json(
    result: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<serde_json::Value, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::InvalidDocument(ValidationErrors::single("", err.body_text())))
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a document id path segment.
pub fn parse_document_id(raw: &str) -> Result<DocumentId, AppError> {
    Uuid::parse_str(raw)
        .map(DocumentId::from_uuid)
        .map_err(|_| AppError::BadRequest(format!("\"{raw}\" is not a valid document id")))
}
