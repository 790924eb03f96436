//! The seam between the submission workflow and the PAC.
//!
//! [`PacClient`](crate::PacClient) is the HTTP implementation. Tests drive
//! the orchestrator with in-process fakes through the same trait.

use async_trait::async_trait;
use pacgate_core::Environment;
use serde_json::Value;

use crate::error::PacApiError;
use crate::types::{AuthToken, PacCredentials, SubmissionReceipt};

/// Authentication and submission against one PAC.
///
/// Each method performs a single attempt. Retrying is the caller's decision.
#[async_trait]
pub trait PacGateway: Send + Sync {
    /// Exchange a company's credential pair for a session token.
    async fn authenticate(
        &self,
        env: Environment,
        credentials: &PacCredentials,
    ) -> Result<AuthToken, PacApiError>;

    /// Submit a fiscal document. Success always carries a CUFE.
    async fn submit(
        &self,
        env: Environment,
        token: &AuthToken,
        document: &Value,
    ) -> Result<SubmissionReceipt, PacApiError>;
}
