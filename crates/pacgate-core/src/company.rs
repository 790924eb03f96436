//! # Companies (Tenants)
//!
//! A [`Company`] owns its fiscal documents, holds one PAC account per
//! [`Environment`], and issues the API keys its ERP uses against the
//! inbound endpoint. PAC accounts and API keys are independent credentials:
//! the first authenticates this gateway to the PAC, the second authenticates
//! the tenant's ERP to this gateway.
//!
//! PAC passwords are secrets. [`PacAccount`] redacts them in `Debug`, and
//! [`Company::redacted`] produces a copy safe to return from read endpoints.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationErrors;
use crate::identity::CompanyId;

const REDACTED: &str = "[REDACTED]";

/// PAC environment a submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "Demo")]
    Demo,
    #[serde(alias = "Production")]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ValidationErrors::single(
                "environment",
                format!("unknown environment \"{other}\" (expected demo or production)"),
            )),
        }
    }
}

/// One PAC account (username/password pair plus usage accounting).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PacAccount {
    /// PAC user (the issuer's tax id for most PACs).
    pub username: String,
    /// PAC authentication secret.
    pub password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_documents_per_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_used_this_month: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for PacAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacAccount")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("is_active", &self.is_active)
            .field("max_documents_per_month", &self.max_documents_per_month)
            .field("documents_used_this_month", &self.documents_used_this_month)
            .finish()
    }
}

impl PacAccount {
    /// Whether both halves of the credential pair are present.
    pub fn has_credentials(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }

    /// Whether the monthly quota (if any) has been used up.
    pub fn quota_exhausted(&self) -> bool {
        match self.max_documents_per_month {
            Some(max) => self.documents_used_this_month.unwrap_or(0) >= max,
            None => false,
        }
    }

    /// Count one more document against the monthly quota.
    pub fn record_usage(&mut self) {
        let used = self.documents_used_this_month.unwrap_or(0);
        self.documents_used_this_month = Some(used.saturating_add(1));
    }
}

/// PAC accounts keyed by environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PacConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo: Option<PacAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<PacAccount>,
}

impl PacConfig {
    pub fn account(&self, env: Environment) -> Option<&PacAccount> {
        match env {
            Environment::Demo => self.demo.as_ref(),
            Environment::Production => self.production.as_ref(),
        }
    }

    pub fn account_mut(&mut self, env: Environment) -> Option<&mut PacAccount> {
        match env {
            Environment::Demo => self.demo.as_mut(),
            Environment::Production => self.production.as_mut(),
        }
    }

    pub fn set_account(&mut self, env: Environment, account: PacAccount) {
        match env {
            Environment::Demo => self.demo = Some(account),
            Environment::Production => self.production = Some(account),
        }
    }

    /// Take each account's monthly usage from `stored`, so a write built
    /// from an older read never rolls the counter back.
    pub fn carry_usage_from(&mut self, stored: &PacConfig) {
        for env in [Environment::Demo, Environment::Production] {
            if let (Some(next), Some(current)) = (self.account_mut(env), stored.account(env)) {
                next.documents_used_this_month = current.documents_used_this_month;
            }
        }
    }
}

/// Lifecycle of a client-facing API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Active,
    Revoked,
}

/// A client-facing API credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub key: String,
    pub status: ApiKeyStatus,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &mask_key(&self.key))
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl ApiKey {
    /// Issue a fresh active key.
    pub fn generate() -> Self {
        Self {
            key: format!("pgk_{}", Uuid::new_v4().simple()),
            status: ApiKeyStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ApiKeyStatus::Active
    }
}

/// Keep the first 8 characters of a key for display.
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}…")
}

/// A tenant company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[schema(value_type = String)]
    pub id: CompanyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruc: Option<String>,
    #[serde(default)]
    pub pac_config: PacConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Create a company with no PAC accounts and no API keys.
    pub fn new(id: CompanyId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            ruc: None,
            pac_config: PacConfig::default(),
            api_keys: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Revoke a key. Returns `false` if the key is unknown.
    pub fn revoke_api_key(&mut self, key: &str) -> bool {
        match self.api_keys.iter_mut().find(|k| k.key == key) {
            Some(found) => {
                found.status = ApiKeyStatus::Revoked;
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Copy with PAC passwords and API keys masked, for read endpoints.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for account in [&mut copy.pac_config.demo, &mut copy.pac_config.production]
            .into_iter()
            .flatten()
        {
            account.password = REDACTED.to_string();
        }
        for key in &mut copy.api_keys {
            key.key = mask_key(&key.key);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(password: &str) -> PacAccount {
        PacAccount {
            username: "155596713-2-2015".into(),
            password: password.into(),
            is_active: true,
            max_documents_per_month: None,
            documents_used_this_month: None,
        }
    }

    #[test]
    fn usage_is_carried_from_the_stored_config() {
        let mut stored = PacConfig::default();
        let mut used = account("old");
        used.documents_used_this_month = Some(7);
        stored.set_account(Environment::Demo, used);

        let mut next = PacConfig::default();
        next.set_account(Environment::Demo, account("new"));
        next.set_account(Environment::Production, account("prod"));
        next.carry_usage_from(&stored);

        let demo = next.account(Environment::Demo).unwrap();
        assert_eq!(demo.documents_used_this_month, Some(7));
        assert_eq!(demo.password, "new");
        assert_eq!(
            next.account(Environment::Production).unwrap().documents_used_this_month,
            None
        );
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("Demo".parse::<Environment>().unwrap(), Environment::Demo);
        assert_eq!(
            "PRODUCTION".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn environment_deserializes_legacy_capitalized_names() {
        let env: Environment = serde_json::from_str("\"Production\"").unwrap();
        assert_eq!(env, Environment::Production);
        assert_eq!(serde_json::to_string(&env).unwrap(), "\"production\"");
    }

    #[test]
    fn pac_account_debug_redacts_password() {
        let debug = format!("{:?}", account("super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn has_credentials_requires_both_halves() {
        assert!(account("pw").has_credentials());
        assert!(!account("").has_credentials());
        let mut no_user = account("pw");
        no_user.username = "  ".into();
        assert!(!no_user.has_credentials());
    }

    #[test]
    fn quota_accounting() {
        let mut acct = account("pw");
        assert!(!acct.quota_exhausted());
        acct.max_documents_per_month = Some(2);
        acct.record_usage();
        assert!(!acct.quota_exhausted());
        acct.record_usage();
        assert!(acct.quota_exhausted());
        assert_eq!(acct.documents_used_this_month, Some(2));
    }

    #[test]
    fn pac_account_defaults_to_active() {
        let acct: PacAccount =
            serde_json::from_str(r#"{"username":"u","password":"p"}"#).unwrap();
        assert!(acct.is_active);
    }

    #[test]
    fn revoke_marks_key_revoked() {
        let mut company = Company::new(CompanyId::new("acme").unwrap(), "Acme");
        let key = ApiKey::generate();
        let raw = key.key.clone();
        company.api_keys.push(key);
        assert!(company.revoke_api_key(&raw));
        assert!(!company.api_keys[0].is_active());
        assert!(!company.revoke_api_key("pgk_unknown"));
    }

    #[test]
    fn redacted_hides_secrets() {
        let mut company = Company::new(CompanyId::new("acme").unwrap(), "Acme");
        company
            .pac_config
            .set_account(Environment::Demo, account("super-secret"));
        company.api_keys.push(ApiKey::generate());
        let raw_key = company.api_keys[0].key.clone();

        let json = serde_json::to_string(&company.redacted()).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains(&raw_key));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn generated_keys_are_prefixed_and_unique() {
        let a = ApiKey::generate();
        let b = ApiKey::generate();
        assert!(a.key.starts_with("pgk_"));
        assert_ne!(a.key, b.key);
        assert!(a.is_active());
    }
}
