//! # Identity Newtypes
//!
//! Distinct identifier types for companies and documents. You cannot pass a
//! [`DocumentId`] where a [`CompanyId`] is expected.
//!
//! [`CompanyId`] is an opaque string chosen by the operator when the tenant
//! is registered and is validated at construction time. [`DocumentId`] is a
//! UUID assigned by the Status Store and is always valid by construction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationErrors;

/// Maximum length of a company identifier.
const COMPANY_ID_MAX_LEN: usize = 128;

/// Identifier of a tenant company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyId(String);

impl CompanyId {
    /// Create a validated company identifier.
    ///
    /// Accepts 1-128 characters from `[A-Za-z0-9_-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationErrors> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > COMPANY_ID_MAX_LEN {
            return Err(ValidationErrors::single(
                "companyId",
                format!("must be 1-{COMPANY_ID_MAX_LEN} characters"),
            ));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationErrors::single(
                "companyId",
                format!("\"{raw}\" contains characters outside [A-Za-z0-9_-]"),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CompanyId {
    type Error = ValidationErrors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompanyId> for String {
    fn from(id: CompanyId) -> Self {
        id.0
    }
}

impl FromStr for CompanyId {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a fiscal document, assigned by the Status Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random document identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
