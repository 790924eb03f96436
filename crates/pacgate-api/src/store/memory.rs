//! In-process [`StatusStore`] backed by `parking_lot` maps.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use pacgate_core::{
    Company, CompanyId, DocumentId, Environment, FiscalDocument, NewFiscalDocument,
};

use super::{empty_status_counts, DocumentFilter, StatusCounts, StatusStore, StoreError};
use crate::auth::constant_time_token_eq;

// -- Generic In-Memory Map ----------------------------------------------------

/// Thread-safe, cloneable in-memory key-value map.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across an `.await`.
/// `parking_lot::RwLock` does not poison, so a panicking writer leaves the
/// map usable.
#[derive(Debug)]
pub struct Store<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Store<K, V> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert only if the key is absent. Returns `false` on a duplicate.
    pub fn insert_new(&self, key: K, value: V) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Values matching `pred`, cloned out under a single read lock.
    pub fn filter(&self, pred: impl Fn(&V) -> bool) -> Vec<V> {
        self.data.read().values().filter(|v| pred(v)).cloned().collect()
    }

    /// First value matching `pred`.
    pub fn find(&self, pred: impl Fn(&V) -> bool) -> Option<V> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under the write lock and may reject the update by
    /// returning `Err`. Returns `None` if the key is absent.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// -- MemoryStore --------------------------------------------------------------

/// Status Store held entirely in memory. State does not survive restarts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    companies: Store<CompanyId, Company>,
    documents: Store<DocumentId, FiscalDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn insert_company(&self, company: Company) -> Result<Company, StoreError> {
        if self.companies.insert_new(company.id.clone(), company.clone()) {
            Ok(company)
        } else {
            Err(StoreError::AlreadyExists {
                kind: "company",
                id: company.id.to_string(),
            })
        }
    }

    async fn get_company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.companies.get(id))
    }

    async fn update_company(&self, company: &Company) -> Result<Company, StoreError> {
        self.companies
            .try_update(&company.id, |stored| {
                stored.name = company.name.clone();
                stored.ruc = company.ruc.clone();
                let mut pac_config = company.pac_config.clone();
                pac_config.carry_usage_from(&stored.pac_config);
                stored.pac_config = pac_config;
                stored.api_keys = company.api_keys.clone();
                stored.updated_at = Utc::now();
                Ok::<_, StoreError>(stored.clone())
            })
            .unwrap_or_else(|| {
                Err(StoreError::NotFound {
                    kind: "company",
                    id: company.id.to_string(),
                })
            })
    }

    async fn find_company_by_api_key(&self, key: &str) -> Result<Option<Company>, StoreError> {
        Ok(self.companies.find(|company| {
            company
                .api_keys
                .iter()
                .any(|k| k.is_active() && constant_time_token_eq(key, &k.key))
        }))
    }

    async fn record_pac_usage(&self, id: &CompanyId, env: Environment) -> Result<(), StoreError> {
        self.companies
            .try_update(id, |company| {
                if let Some(account) = company.pac_config.account_mut(env) {
                    account.record_usage();
                    company.updated_at = Utc::now();
                }
                Ok(())
            })
            .unwrap_or_else(|| {
                Err(StoreError::NotFound {
                    kind: "company",
                    id: id.to_string(),
                })
            })
    }

    async fn create_document(&self, new: NewFiscalDocument) -> Result<FiscalDocument, StoreError> {
        let doc = new.into_document(DocumentId::new());
        if self.documents.insert_new(doc.id, doc.clone()) {
            Ok(doc)
        } else {
            Err(StoreError::AlreadyExists {
                kind: "document",
                id: doc.id.to_string(),
            })
        }
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<FiscalDocument>, StoreError> {
        Ok(self.documents.get(&id))
    }

    async fn list_documents(
        &self,
        company: &CompanyId,
        filter: DocumentFilter,
    ) -> Result<Vec<FiscalDocument>, StoreError> {
        let mut docs = self.documents.filter(|d| {
            &d.company_id == company && filter.status.map_or(true, |s| d.status == s)
        });
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count_documents_by_status(
        &self,
        company: &CompanyId,
    ) -> Result<StatusCounts, StoreError> {
        let mut counts = empty_status_counts();
        for doc in self.documents.filter(|d| &d.company_id == company) {
            *counts.entry(doc.status.as_str()).or_default() += 1;
        }
        Ok(counts)
    }

    async fn update_document(
        &self,
        document: &FiscalDocument,
        expected_version: u64,
    ) -> Result<FiscalDocument, StoreError> {
        self.documents
            .try_update(&document.id, |stored| {
                if stored.version != expected_version {
                    return Err(StoreError::VersionConflict {
                        id: document.id,
                        expected: expected_version,
                    });
                }
                let mut next = document.clone();
                next.version = expected_version + 1;
                *stored = next.clone();
                Ok(next)
            })
            .unwrap_or_else(|| {
                Err(StoreError::NotFound {
                    kind: "document",
                    id: document.id.to_string(),
                })
            })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
