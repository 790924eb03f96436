//! # Startup Seeding
//!
//! Optionally loads companies from `COMPANIES_SEED_FILE` (a JSON array of
//! [`Company`] records, camelCase, PAC passwords in clear) and inserts them
//! into the Status Store. Companies that already exist are left as stored,
//! so restarting against a persistent database is harmless.

use std::path::Path;

use pacgate_core::Company;

use crate::store::{StatusStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("seed file {path} is not a JSON array of companies: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to store seeded company: {0}")]
    Store(#[from] StoreError),
}

/// Parse a seed document.
pub fn parse_companies(raw: &str) -> Result<Vec<Company>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Insert every company from `path`. Returns how many were new.
pub async fn seed_companies(store: &dyn StatusStore, path: &Path) -> Result<usize, BootstrapError> {
    let shown = path.display().to_string();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BootstrapError::Io {
            path: shown.clone(),
            source,
        })?;
    let companies = parse_companies(&raw).map_err(|source| BootstrapError::Parse {
        path: shown.clone(),
        source,
    })?;

    let total = companies.len();
    let mut inserted = 0;
    for company in companies {
        let id = company.id.clone();
        match store.insert_company(company).await {
            Ok(_) => {
                inserted += 1;
                tracing::info!(company_id = %id, "seeded company");
            }
            Err(StoreError::AlreadyExists { .. }) => {
                tracing::debug!(company_id = %id, "seed company already present");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(path = %shown, total, inserted, "company seed file loaded");
    Ok(inserted)
}
