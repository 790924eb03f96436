//! # Inbound Document Schema Validation
//!
//! Validates inbound ERP payloads against the PAC document JSON Schema
//! (Draft 2020-12) embedded in this crate at `schemas/documento.schema.json`.
//!
//! Schema validation is a trust boundary: every violation is reported with
//! the JSON Pointer of the offending field so the ERP can fix its payload.
//! Nothing is persisted for a payload that fails here.
//!
//! The compiled validator is built once at startup and handed to the
//! [`DocumentMapper`](crate::mapper::DocumentMapper); there is no global
//! schema registry.

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use crate::error::{FieldViolation, ValidationErrors};

/// Raw JSON Schema of the PAC document.
pub const DOCUMENT_SCHEMA: &str = include_str!("../schemas/documento.schema.json");

/// Failure to load or compile the embedded schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("embedded document schema is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to compile document schema: {0}")]
    Build(String),
}

/// Compiled validator for inbound PAC documents.
pub struct DocumentSchema {
    validator: Validator,
}

impl std::fmt::Debug for DocumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSchema").finish_non_exhaustive()
    }
}

impl DocumentSchema {
    /// Compile the embedded schema.
    pub fn new() -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
        Self::from_value(&schema)
    }

    /// Compile an arbitrary schema value (used by tests).
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let validator = opts
            .build(schema)
            .map_err(|e| SchemaError::Build(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Validate an instance, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidationErrors> {
        let violations: Vec<FieldViolation> = self
            .validator
            .iter_errors(instance)
            .map(|e| FieldViolation::new(e.instance_path.to_string(), e.to_string()))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(violations))
        }
    }
}
