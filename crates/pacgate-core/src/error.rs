//! # Error Taxonomy
//!
//! Structured error types for the gateway, built with `thiserror`.
//!
//! [`PacgateError`] is the one error type that crosses component boundaries
//! (resolver, orchestrator, store adapters). PAC communication failures are
//! deliberately absent from the "raised" path of the orchestrator: they are
//! recorded into the document's history and reported as an unsuccessful
//! outcome instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::identity::DocumentId;

/// Top-level error type for gateway workflows.
#[derive(Error, Debug)]
pub enum PacgateError {
    /// Missing or invalid PAC credentials / environment configuration.
    /// Fatal for the workflow and surfaced to an operator.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Inbound payload failed validation. Never persisted.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Unknown company or document.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Resource kind ("company", "document").
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The PAC could not be reached or refused the request.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// The document was not in a state that allows the operation, or a
    /// concurrent writer changed it first.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failure in the Status Store.
    #[error("store error: {0}")]
    Store(String),

    /// The PAC answered but its outcome could not be written to the store.
    /// `cufe` is set when the PAC accepted the document.
    #[error("PAC outcome for document {document_id} was not recorded: {reason}")]
    OutcomeNotRecorded {
        document_id: DocumentId,
        cufe: Option<String>,
        reason: String,
    },
}

impl PacgateError {
    /// Shorthand for a missing company.
    pub fn company_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: "company",
            id: id.to_string(),
        }
    }

    /// A PAC call that failed at `stage` ("Authentication", "Submission").
    pub fn external(stage: &str, err: impl fmt::Display) -> Self {
        Self::ExternalService(format!("{stage} failed: {err}"))
    }

    /// Shorthand for a missing document.
    pub fn document_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: "document",
            id: id.to_string(),
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    /// JSON Pointer to the offending field (empty for the document root).
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Collection of field violations produced while validating one payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Convenience constructor for a single violation.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldViolation::new(field, message)])
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<FieldViolation> {
        self.violations
    }

    /// True if any violation points at `field`.
    pub fn touches(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
