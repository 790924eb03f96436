//! Credential Resolver: look up a company's PAC credential pair for one
//! environment.

use std::sync::Arc;

use pacgate_core::{CompanyId, Environment, PacgateError};
use pacgate_pac_client::PacCredentials;

use crate::store::StatusStore;

/// Read-only view over the companies in the Status Store.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn StatusStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Resolve `{nit, token}` for `company_id` in `env`.
    ///
    /// Fails with `NotFound` for an unknown company, and with
    /// `Configuration` when the account is missing, incomplete, inactive, or
    /// out of monthly quota.
    pub async fn resolve(
        &self,
        company_id: &CompanyId,
        env: Environment,
    ) -> Result<PacCredentials, PacgateError> {
        let company = self
            .store
            .get_company(company_id)
            .await?
            .ok_or_else(|| PacgateError::company_not_found(company_id))?;

        let account = company.pac_config.account(env).ok_or_else(|| {
            PacgateError::Configuration(format!(
                "company {company_id} has no PAC account for the {env} environment"
            ))
        })?;

        if !account.has_credentials() {
            return Err(PacgateError::Configuration(format!(
                "PAC credentials for company {company_id} ({env}) are incomplete"
            )));
        }
        if !account.is_active {
            return Err(PacgateError::Configuration(format!(
                "PAC account for company {company_id} ({env}) is inactive"
            )));
        }
        if account.quota_exhausted() {
            return Err(PacgateError::Configuration(format!(
                "monthly document quota exhausted for company {company_id} ({env})"
            )));
        }

        Ok(PacCredentials::new(
            account.username.trim(),
            account.password.as_str(),
        ))
    }
}
