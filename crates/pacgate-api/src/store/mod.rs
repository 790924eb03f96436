//! # Status Store
//!
//! Persistence seam for companies and fiscal documents. The orchestrator,
//! the credential resolver and the route handlers only see
//! [`StatusStore`]; two implementations ship with the service:
//!
//! - [`memory::MemoryStore`] keeps everything in process (development,
//!   tests, single-node demos).
//! - [`postgres::PgStatusStore`] persists to PostgreSQL through the
//!   free functions in [`crate::db`].
//!
//! ## Document writes
//!
//! Every document update is a compare-and-set on the `version` counter:
//! [`StatusStore::update_document`] succeeds only if the stored version
//! equals the version the caller read, and bumps it by one. A mismatch is
//! reported as [`StoreError::VersionConflict`] and nothing is written.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use pacgate_core::{
    Company, CompanyId, DocumentId, DocumentStatus, Environment, FiscalDocument,
    NewFiscalDocument, PacgateError,
};

/// Default page size for document listings.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Errors from Status Store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("document {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: DocumentId, expected: u64 },

    /// Connection, query, or row-decoding failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for PacgateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => PacgateError::NotFound { kind, id },
            StoreError::AlreadyExists { .. } | StoreError::VersionConflict { .. } => {
                PacgateError::Conflict(err.to_string())
            }
            StoreError::Database(_) => PacgateError::Store(err.to_string()),
        }
    }
}

/// Listing filter for a tenant's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Per-status document counts for one company. Statuses with no documents
/// are present with a zero count.
pub type StatusCounts = BTreeMap<&'static str, u64>;

/// An empty count map with every status present.
pub fn empty_status_counts() -> StatusCounts {
    DocumentStatus::ALL
        .into_iter()
        .map(|status| (status.as_str(), 0))
        .collect()
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Register a new company. Fails with `AlreadyExists` on a duplicate id.
    async fn insert_company(&self, company: Company) -> Result<Company, StoreError>;

    async fn get_company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError>;

    /// Replace a company's mutable fields (name, RUC, PAC accounts, API keys).
    async fn update_company(&self, company: &Company) -> Result<Company, StoreError>;

    /// Resolve an **active** API key to its owning company.
    async fn find_company_by_api_key(&self, key: &str) -> Result<Option<Company>, StoreError>;

    /// Count one accepted submission against the company's monthly quota for
    /// `env`. A company without an account for `env` is left unchanged.
    async fn record_pac_usage(&self, id: &CompanyId, env: Environment) -> Result<(), StoreError>;

    /// Persist a mapped document as `pending` under a fresh id.
    async fn create_document(&self, new: NewFiscalDocument) -> Result<FiscalDocument, StoreError>;

    async fn get_document(&self, id: DocumentId) -> Result<Option<FiscalDocument>, StoreError>;

    /// A company's documents, newest first.
    async fn list_documents(
        &self,
        company: &CompanyId,
        filter: DocumentFilter,
    ) -> Result<Vec<FiscalDocument>, StoreError>;

    async fn count_documents_by_status(
        &self,
        company: &CompanyId,
    ) -> Result<StatusCounts, StoreError>;

    /// Compare-and-set write of a whole document.
    ///
    /// Succeeds only if the stored version equals `expected_version`. The
    /// returned record carries the new version.
    async fn update_document(
        &self,
        document: &FiscalDocument,
        expected_version: u64,
    ) -> Result<FiscalDocument, StoreError>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let nf: PacgateError = StoreError::NotFound {
            kind: "document",
            id: "x".into(),
        }
        .into();
        assert!(matches!(nf, PacgateError::NotFound { kind: "document", .. }));

        let conflict: PacgateError = StoreError::VersionConflict {
            id: DocumentId::new(),
            expected: 3,
        }
        .into();
        assert!(matches!(conflict, PacgateError::Conflict(_)));

        let db: PacgateError = StoreError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(db, PacgateError::Store(_)));
    }

    #[test]
    fn empty_counts_cover_every_status() {
        let counts = empty_status_counts();
        assert_eq!(counts.len(), DocumentStatus::ALL.len());
        assert!(counts.values().all(|&n| n == 0));
    }
}
