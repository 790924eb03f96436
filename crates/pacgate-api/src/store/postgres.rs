//! PostgreSQL-backed [`StatusStore`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use pacgate_core::{
    Company, CompanyId, DocumentId, DocumentStatus, Environment, FiscalDocument,
    NewFiscalDocument,
};

use super::{empty_status_counts, DocumentFilter, StatusCounts, StatusStore, StoreError};
use crate::db;

/// Status Store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Whether a query failed on a unique constraint (SQLSTATE 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn insert_company(&self, company: Company) -> Result<Company, StoreError> {
        match db::companies::insert(&self.pool, &company).await {
            Ok(()) => Ok(company),
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists {
                kind: "company",
                id: company.id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(db::companies::get_by_id(&self.pool, id.as_str()).await?)
    }

    async fn update_company(&self, company: &Company) -> Result<Company, StoreError> {
        let mut next = company.clone();
        next.updated_at = Utc::now();
        db::companies::update(&self.pool, &next)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: "company",
                id: company.id.to_string(),
            })
    }

    async fn find_company_by_api_key(&self, key: &str) -> Result<Option<Company>, StoreError> {
        Ok(db::companies::find_by_active_key(&self.pool, key).await?)
    }

    async fn record_pac_usage(&self, id: &CompanyId, env: Environment) -> Result<(), StoreError> {
        if db::companies::record_usage(&self.pool, id.as_str(), env).await? {
            return Ok(());
        }
        // No row touched: either no account for `env` (fine) or no company.
        if db::companies::exists(&self.pool, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                kind: "company",
                id: id.to_string(),
            })
        }
    }

    async fn create_document(&self, new: NewFiscalDocument) -> Result<FiscalDocument, StoreError> {
        let doc = new.into_document(DocumentId::new());
        match db::documents::insert(&self.pool, &doc).await {
            Ok(()) => Ok(doc),
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists {
                kind: "document",
                id: doc.id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<FiscalDocument>, StoreError> {
        Ok(db::documents::get_by_id(&self.pool, id).await?)
    }

    async fn list_documents(
        &self,
        company: &CompanyId,
        filter: DocumentFilter,
    ) -> Result<Vec<FiscalDocument>, StoreError> {
        Ok(db::documents::list_by_company(
            &self.pool,
            company,
            filter.status,
            i64::from(filter.limit),
            i64::from(filter.offset),
        )
        .await?)
    }

    async fn count_documents_by_status(
        &self,
        company: &CompanyId,
    ) -> Result<StatusCounts, StoreError> {
        let mut counts = empty_status_counts();
        for (status, count) in db::documents::count_by_status(&self.pool, company).await? {
            match DocumentStatus::parse(&status) {
                Some(status) => {
                    counts.insert(status.as_str(), u64::try_from(count).unwrap_or(0));
                }
                None => tracing::warn!(%status, company_id = %company, "ignoring unknown document status"),
            }
        }
        Ok(counts)
    }

    async fn update_document(
        &self,
        document: &FiscalDocument,
        expected_version: u64,
    ) -> Result<FiscalDocument, StoreError> {
        if db::documents::update_versioned(&self.pool, document, expected_version).await? {
            let mut next = document.clone();
            next.version = expected_version + 1;
            return Ok(next);
        }
        if db::documents::exists(&self.pool, document.id).await? {
            Err(StoreError::VersionConflict {
                id: document.id,
                expected: expected_version,
            })
        } else {
            Err(StoreError::NotFound {
                kind: "document",
                id: document.id.to_string(),
            })
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
