//! # Document Mapper
//!
//! Pure, synchronous transformation from an inbound ERP payload into a
//! pending [`NewFiscalDocument`].
//!
//! Validation happens in two passes, both before anything is built:
//!
//! 1. JSON Schema validation ([`DocumentSchema`]) for shape, required
//!    fields and decimal formats.
//! 2. Semantic checks the schema cannot express: the invoice total must be
//!    non-negative and the customer's legal name must not be blank.
//!
//! Any violation fails the whole payload. The mapper never persists; the
//! caller hands the result to the Status Store.

use chrono::Utc;
use serde_json::Value;

use crate::document::{DocumentType, NewFiscalDocument, ProcessingStep, StepKind, StepStatus};
use crate::error::{FieldViolation, ValidationErrors};
use crate::identity::CompanyId;
use crate::payload::InvoicePayload;
use crate::schema::{DocumentSchema, SchemaError};

const TOTAL_FIELD: &str = "/documento/totalesSubTotales/totalFactura";
const CLIENT_FIELD: &str = "/documento/datosTransaccion/cliente/razonSocial";

/// Maps inbound payloads into pending documents.
#[derive(Debug)]
pub struct DocumentMapper {
    schema: DocumentSchema,
}

impl DocumentMapper {
    pub fn new(schema: DocumentSchema) -> Self {
        Self { schema }
    }

    /// Build a mapper around the embedded PAC document schema.
    pub fn with_embedded_schema() -> Result<Self, SchemaError> {
        Ok(Self::new(DocumentSchema::new()?))
    }

    /// Validate `payload` and produce a pending document owned by `company_id`.
    ///
    /// The returned document carries `payload` verbatim as its original data
    /// and a single `received/success` history entry.
    pub fn map(
        &self,
        company_id: &CompanyId,
        payload: &Value,
    ) -> Result<NewFiscalDocument, ValidationErrors> {
        self.schema.validate(payload)?;

        let parsed: InvoicePayload = serde_json::from_value(payload.clone()).map_err(|e| {
            ValidationErrors::single("", format!("payload does not match the document shape: {e}"))
        })?;

        let transaction = &parsed.documento.datos_transaccion;
        let mut violations = Vec::new();

        let amount = match normalize_amount(&parsed.documento.totales_sub_totales.total_factura) {
            Ok(amount) => Some(amount),
            Err(msg) => {
                violations.push(FieldViolation::new(TOTAL_FIELD, msg));
                None
            }
        };

        let client = transaction.cliente.razon_social.trim();
        if client.is_empty() {
            violations.push(FieldViolation::new(CLIENT_FIELD, "must not be blank"));
        }

        let amount = match amount {
            Some(amount) if violations.is_empty() => amount,
            _ => return Err(ValidationErrors::new(violations)),
        };

        let document_type = DocumentType::from_code(&transaction.tipo_documento);
        let now = Utc::now();

        Ok(NewFiscalDocument {
            company_id: company_id.clone(),
            document_type,
            document_number: Some(transaction.numero_documento_fiscal.trim().to_string()),
            amount,
            client: client.to_string(),
            original_data: payload.clone(),
            status_history: vec![ProcessingStep::new(
                StepKind::Received,
                StepStatus::Success,
                format!("Document received ({document_type})"),
            )
            .at(now)],
            created_at: now,
        })
    }
}

/// Check that `raw` is a non-negative decimal and return it trimmed.
fn normalize_amount(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let (integer, fraction) = match trimmed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (trimmed, None),
    };
    let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if trimmed.starts_with('-') {
        return Err(format!("\"{raw}\" must not be negative"));
    }
    if !digits_only(integer) || !fraction.map_or(true, digits_only) {
        return Err(format!("\"{raw}\" is not a valid decimal amount"));
    }
    Ok(trimmed.to_string())
}
