//! # Submission Orchestrator
//!
//! Drives one document through a PAC submission:
//!
//! ```text
//! read ─▶ resolve credentials ─▶ write processing ─▶ authenticate ─▶ submit ─▶ write terminal
//! ```
//!
//! Credential resolution failures are returned to the caller and leave the
//! document untouched. PAC failures (authentication or submission) are not
//! errors at this level: they are recorded in the document history, the
//! document becomes `rejected`, and the outcome reports `success: false`.
//!
//! Every write is a compare-and-set on the document version, so two callers
//! racing on one document cannot both win. The loser gets `Conflict`.
//!
//! Once the PAC has answered, its outcome is written with bounded retries.
//! If that still fails the document stays `processing` and the returned
//! `OutcomeNotRecorded` error carries the CUFE; an operator resolves it with
//! [`SubmissionOrchestrator::reclaim`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pacgate_core::{
    CompanyId, DocumentId, DocumentStatus, Environment, FiscalDocument, PacgateError,
};
use pacgate_pac_client::{PacGateway, SubmissionReceipt};
use serde::Serialize;
use utoipa::ToSchema;

use crate::credentials::CredentialResolver;
use crate::middleware::metrics::{ApiMetrics, SubmissionResult};
use crate::store::StatusStore;

/// Result of one orchestrator run.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    /// `true` when the PAC accepted the document and issued a CUFE.
    pub success: bool,
    /// PAC acceptance message, or the recorded failure.
    pub message: String,
    /// The document as persisted after the run.
    pub document: FiscalDocument,
}

#[derive(Clone)]
pub struct SubmissionOrchestrator {
    store: Arc<dyn StatusStore>,
    gateway: Arc<dyn PacGateway>,
    resolver: CredentialResolver,
    metrics: ApiMetrics,
}

impl SubmissionOrchestrator {
    pub fn new(
        store: Arc<dyn StatusStore>,
        gateway: Arc<dyn PacGateway>,
        metrics: ApiMetrics,
    ) -> Self {
        Self {
            resolver: CredentialResolver::new(Arc::clone(&store)),
            store,
            gateway,
            metrics,
        }
    }

    /// Run the workflow regardless of the document's current status.
    ///
    /// Not idempotent: a second call on an already submitted document
    /// repeats the PAC exchange and appends another set of history entries.
    #[tracing::instrument(skip_all, fields(company_id = %company_id, document_id = %document_id, environment = %env))]
    pub async fn submit(
        &self,
        company_id: &CompanyId,
        document_id: DocumentId,
        env: Environment,
    ) -> Result<SubmissionOutcome, PacgateError> {
        let document = self.load(company_id, document_id).await?;
        self.run(document, env).await
    }

    /// Run the workflow only if the document is still `pending`.
    ///
    /// Any other status is refused with `Conflict` before credentials are
    /// resolved or the PAC is contacted. The `processing` write doubles as
    /// the claim: a concurrent claimer loses the version check.
    #[tracing::instrument(skip_all, fields(company_id = %company_id, document_id = %document_id, environment = %env))]
    pub async fn submit_claimed(
        &self,
        company_id: &CompanyId,
        document_id: DocumentId,
        env: Environment,
    ) -> Result<SubmissionOutcome, PacgateError> {
        let document = self.load(company_id, document_id).await?;
        if !document.status.is_claimable() {
            tracing::info!(status = %document.status, "refusing to submit a document that is not pending");
            return Err(PacgateError::Conflict(format!(
                "document {document_id} is {}; only pending documents can be submitted",
                document.status
            )));
        }
        self.run(document, env).await
    }

    /// Fetch a document owned by `company_id`. Another tenant's document is
    /// reported as not found.
    async fn load(
        &self,
        company_id: &CompanyId,
        document_id: DocumentId,
    ) -> Result<FiscalDocument, PacgateError> {
        match self.store.get_document(document_id).await? {
            Some(doc) if &doc.company_id == company_id => Ok(doc),
            _ => Err(PacgateError::document_not_found(document_id)),
        }
    }

    /// Resolve a document left in `processing` by an interrupted run.
    ///
    /// With a CUFE the document is recorded as accepted by the PAC. Without
    /// one it goes back to `pending` and can be submitted again. Documents in
    /// any other status are refused with `Conflict`.
    #[tracing::instrument(skip_all, fields(document_id = %document_id))]
    pub async fn reclaim(
        &self,
        document_id: DocumentId,
        cufe: Option<String>,
    ) -> Result<FiscalDocument, PacgateError> {
        let mut document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| PacgateError::document_not_found(document_id))?;
        if document.status != DocumentStatus::Processing {
            return Err(PacgateError::Conflict(format!(
                "document {document_id} is {}; only processing documents can be reclaimed",
                document.status
            )));
        }

        let read_version = document.version;
        let now = Utc::now();
        match cufe {
            Some(cufe) => {
                tracing::info!(cufe = %cufe, "recording PAC acceptance for reclaimed document");
                document.record_acceptance(cufe, "Accepted by PAC (recorded by operator)", now);
            }
            None => {
                tracing::info!("returning reclaimed document to pending");
                document.release_claim("Submission outcome was not recorded; returned to pending", now);
            }
        }
        Ok(self.store.update_document(&document, read_version).await?)
    }

    async fn run(
        &self,
        mut document: FiscalDocument,
        env: Environment,
    ) -> Result<SubmissionOutcome, PacgateError> {
        let credentials = self.resolver.resolve(&document.company_id, env).await?;

        let read_version = document.version;
        document.begin_submission(Utc::now());
        let document = self.store.update_document(&document, read_version).await?;
        tracing::debug!(version = document.version, "document marked processing");

        let result = match self.gateway.authenticate(env, &credentials).await {
            Err(e) => Err(PacgateError::external("Authentication", e)),
            Ok(token) => self
                .gateway
                .submit(env, &token, &document.original_data)
                .await
                .map_err(|e| PacgateError::external("Submission", e)),
        };

        let outcome = match result {
            Ok(receipt) => {
                tracing::info!(cufe = %receipt.cufe, "PAC accepted document");
                self.metrics.record_submission(env, SubmissionResult::Accepted);
                if let Err(e) = self.store.record_pac_usage(&document.company_id, env).await {
                    tracing::warn!(error = %e, "failed to record PAC usage");
                }
                PacOutcome::Accepted(receipt)
            }
            Err(err) => {
                let message = match err {
                    PacgateError::ExternalService(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!(reason = %message, "PAC submission failed");
                self.metrics.record_submission(env, SubmissionResult::Rejected);
                PacOutcome::Rejected(message)
            }
        };

        let document = self.persist_outcome(document, &outcome).await?;
        let (success, message) = match outcome {
            PacOutcome::Accepted(receipt) => (true, receipt.message),
            PacOutcome::Rejected(message) => (false, message),
        };
        Ok(SubmissionOutcome {
            success,
            message,
            document,
        })
    }

    /// Write the PAC outcome onto the claimed document.
    ///
    /// A failed write is retried against a fresh read, up to
    /// [`OUTCOME_WRITE_ATTEMPTS`] times, as long as the document is still
    /// `processing`. When every attempt fails the error carries the CUFE so
    /// the acceptance can be recorded later through [`Self::reclaim`].
    async fn persist_outcome(
        &self,
        mut document: FiscalDocument,
        outcome: &PacOutcome,
    ) -> Result<FiscalDocument, PacgateError> {
        let document_id = document.id;
        let mut reason = String::new();

        for attempt in 1..=OUTCOME_WRITE_ATTEMPTS {
            let expected = document.version;
            let mut next = document.clone();
            outcome.apply(&mut next, Utc::now());
            match self.store.update_document(&next, expected).await {
                Ok(stored) => return Ok(stored),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "failed to persist PAC outcome");
                    reason = e.to_string();
                }
            }

            match self.store.get_document(document_id).await {
                Ok(Some(current)) if current.status == DocumentStatus::Processing => {
                    document = current;
                }
                Ok(Some(current)) => {
                    reason = format!("document moved to {} while the PAC answered", current.status);
                    break;
                }
                Ok(None) => {
                    reason = "document disappeared while the PAC answered".to_string();
                    break;
                }
                Err(e) => tracing::warn!(attempt, error = %e, "failed to re-read document"),
            }
        }

        let cufe = outcome.cufe().map(str::to_string);
        tracing::error!(
            cufe = cufe.as_deref().unwrap_or("none"),
            reason = %reason,
            "PAC outcome not recorded; document left in processing"
        );
        Err(PacgateError::OutcomeNotRecorded {
            document_id,
            cufe,
            reason,
        })
    }
}

/// Attempts at writing a PAC outcome before giving up.
const OUTCOME_WRITE_ATTEMPTS: usize = 3;

/// What the PAC said about one submission.
enum PacOutcome {
    Accepted(SubmissionReceipt),
    Rejected(String),
}

impl PacOutcome {
    fn apply(&self, document: &mut FiscalDocument, now: DateTime<Utc>) {
        match self {
            Self::Accepted(receipt) => {
                document.record_acceptance(receipt.cufe.clone(), receipt.message.clone(), now)
            }
            Self::Rejected(message) => document.record_rejection(message.clone(), now),
        }
    }

    fn cufe(&self) -> Option<&str> {
        match self {
            Self::Accepted(receipt) => Some(&receipt.cufe),
            Self::Rejected(_) => None,
        }
    }
}
