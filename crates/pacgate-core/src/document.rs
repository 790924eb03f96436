//! # Fiscal Documents
//!
//! A [`FiscalDocument`] is one invoice, credit note or debit note received
//! from a tenant's ERP. Its lifecycle is:
//!
//! ```text
//! pending ──▶ processing ──▶ sent_to_pac
//!                       └──▶ rejected
//! ```
//!
//! `approved` and `cancelled` are part of the model (an asynchronous
//! confirmation from the tax authority, and an out-of-band cancellation) but
//! no component in this workspace produces them.
//!
//! ## Status History
//!
//! `status_history` is append-only. Every mutation helper on
//! [`FiscalDocument`] pushes exactly one [`ProcessingStep`]; nothing removes
//! or reorders entries. The `received` step written by the mapper is always
//! the first entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::{CompanyId, DocumentId};

// -- Enumerations -------------------------------------------------------------

/// Kind of fiscal document, derived from the PAC document-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Factura,
    NotaCredito,
    NotaDebito,
    FacturaExportacion,
}

impl DocumentType {
    /// Map a PAC `tipoDocumento` code to a document type.
    ///
    /// Unknown codes fall back to [`DocumentType::Factura`].
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "01" => Self::Factura,
            "05" => Self::NotaCredito,
            "06" => Self::NotaDebito,
            "04" => Self::FacturaExportacion,
            _ => Self::Factura,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factura => "factura",
            Self::NotaCredito => "nota_credito",
            Self::NotaDebito => "nota_debito",
            Self::FacturaExportacion => "factura_exportacion",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "factura" => Some(Self::Factura),
            "nota_credito" => Some(Self::NotaCredito),
            "nota_debito" => Some(Self::NotaDebito),
            "factura_exportacion" => Some(Self::FacturaExportacion),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a fiscal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Stored, not yet submitted.
    Pending,
    /// A submission is in flight.
    Processing,
    /// The PAC accepted the document and issued a CUFE.
    SentToPac,
    /// Final confirmation from the tax authority.
    Approved,
    /// Authentication or submission failed.
    Rejected,
    /// Cancelled out of band.
    Cancelled,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 6] = [
        Self::Pending,
        Self::Processing,
        Self::SentToPac,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::SentToPac => "sent_to_pac",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Whether a submission may claim a document in this status.
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of processing an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Received,
    Validated,
    Transformed,
    SentToPac,
    PacResponse,
    DgiResponse,
}

/// Outcome recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
    Warning,
}

// -- Processing step ----------------------------------------------------------

/// Immutable audit record appended to a document's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStep {
    pub step: StepKind,
    pub status: StepStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ProcessingStep {
    pub fn new(step: StepKind, status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            step,
            status,
            message: message.into(),
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the timestamp (used when one logical update writes several
    /// fields that must share a clock reading).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// -- Documents ----------------------------------------------------------------

/// A mapped document that has not been persisted yet. The Status Store
/// assigns its [`DocumentId`] on creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFiscalDocument {
    pub company_id: CompanyId,
    pub document_type: DocumentType,
    pub document_number: Option<String>,
    pub amount: String,
    pub client: String,
    pub original_data: serde_json::Value,
    pub status_history: Vec<ProcessingStep>,
    pub created_at: DateTime<Utc>,
}

impl NewFiscalDocument {
    /// Materialize the record under the identifier chosen by the store.
    pub fn into_document(self, id: DocumentId) -> FiscalDocument {
        FiscalDocument {
            id,
            company_id: self.company_id,
            document_type: self.document_type,
            document_number: self.document_number,
            status: DocumentStatus::Pending,
            status_history: self.status_history,
            original_data: self.original_data,
            amount: self.amount,
            client: self.client,
            cufe: None,
            error_details: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            processed_at: None,
            version: 0,
        }
    }
}

/// A fiscal document as stored by the Status Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FiscalDocument {
    #[schema(value_type = String, format = Uuid)]
    pub id: DocumentId,
    #[schema(value_type = String)]
    pub company_id: CompanyId,
    pub document_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    pub status: DocumentStatus,
    pub status_history: Vec<ProcessingStep>,
    #[schema(value_type = Object)]
    pub original_data: serde_json::Value,
    pub amount: String,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cufe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Write counter for optimistic concurrency. Bumped by the store on
    /// every successful update.
    #[serde(default)]
    pub version: u64,
}

impl FiscalDocument {
    /// Most recent history entry.
    pub fn latest_step(&self) -> Option<&ProcessingStep> {
        self.status_history.last()
    }

    /// Mark the start of a PAC submission.
    pub fn begin_submission(&mut self, now: DateTime<Utc>) {
        self.status = DocumentStatus::Processing;
        self.status_history.push(
            ProcessingStep::new(
                StepKind::SentToPac,
                StepStatus::Warning,
                "Submission to PAC starting",
            )
            .at(now),
        );
        self.updated_at = now;
    }

    /// Record a failed authentication or submission.
    pub fn record_rejection(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        let message = message.into();
        self.status = DocumentStatus::Rejected;
        self.status_history.push(
            ProcessingStep::new(StepKind::PacResponse, StepStatus::Error, message.clone()).at(now),
        );
        self.error_details = Some(message);
        self.updated_at = now;
    }

    /// Hand a document left in `processing` back to `pending` so it can be
    /// submitted again.
    pub fn release_claim(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.status = DocumentStatus::Pending;
        self.status_history.push(
            ProcessingStep::new(StepKind::PacResponse, StepStatus::Warning, message).at(now),
        );
        self.updated_at = now;
    }

    /// Record a successful submission.
    ///
    /// The CUFE and `processed_at` are only written if not already present.
    pub fn record_acceptance(
        &mut self,
        cufe: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let cufe = cufe.into();
        self.status = DocumentStatus::SentToPac;
        self.status_history.push(
            ProcessingStep::new(StepKind::PacResponse, StepStatus::Success, message)
                .with_details(serde_json::json!({ "cufe": cufe }))
                .at(now),
        );
        if self.cufe.is_none() {
            self.cufe = Some(cufe);
        }
        if self.processed_at.is_none() {
            self.processed_at = Some(now);
        }
        self.error_details = None;
        self.updated_at = now;
    }
}
