//! # pacgate-pac-client -- Typed Rust client for the PAC REST API
//!
//! Two calls make up a submission:
//!
//! 1. `POST {base}/api/Autenticacion` exchanges a company's credential pair
//!    for a session token.
//! 2. `POST {base}/api/Enviar` submits the document JSON under that token
//!    and returns the CUFE on acceptance.
//!
//! The base URL depends on the target [`Environment`] and comes from
//! [`PacApiConfig`].
//!
//! ## Failure model
//!
//! Every call is a single attempt bounded by the configured timeout. A 2xx
//! response is not enough for success: the body's `codigo` must be 200, and
//! a submission must carry a non-empty CUFE. Anything else surfaces as a
//! [`PacApiError`] and the caller decides what to record.

pub mod config;
pub mod error;
pub mod gateway;
pub mod types;

pub use config::{ConfigError, PacApiConfig};
pub use error::PacApiError;
pub use gateway::PacGateway;
pub use types::{AuthToken, PacCode, PacCredentials, SubmissionReceipt};

use std::time::Duration;

use async_trait::async_trait;
use pacgate_core::Environment;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{code_label, first_text, parse_expiration, AuthRequest, AuthResponse, SubmitResponse};

const AUTH_PATH: &str = "api/Autenticacion";
const SUBMIT_PATH: &str = "api/Enviar";

/// HTTP implementation of [`PacGateway`].
#[derive(Debug, Clone)]
pub struct PacClient {
    http: reqwest::Client,
    config: PacApiConfig,
}

impl PacClient {
    /// Create a client from configuration.
    pub fn new(config: PacApiConfig) -> Result<Self, PacApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PacApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }

    /// Create a client from `PAC_*` environment variables.
    pub fn from_env() -> Result<Self, PacApiError> {
        Self::new(PacApiConfig::from_env()?)
    }

    pub fn config(&self) -> &PacApiConfig {
        &self.config
    }
}

#[async_trait]
impl PacGateway for PacClient {
    async fn authenticate(
        &self,
        env: Environment,
        credentials: &PacCredentials,
    ) -> Result<AuthToken, PacApiError> {
        let endpoint = "POST /api/Autenticacion";
        let url = self.config.endpoint_url(env, AUTH_PATH);
        tracing::debug!(environment = %env, nit = %credentials.nit, "authenticating against PAC");

        let resp = self
            .http
            .post(&url)
            .json(&AuthRequest {
                usuario: &credentials.nit,
                clave: credentials.token.as_str(),
            })
            .send()
            .await
            .map_err(|e| PacApiError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let body: AuthResponse = read_json(endpoint, resp).await?;

        let accepted = body.codigo.as_ref().is_some_and(PacCode::is_success);
        let token = body.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match (accepted, token) {
            (true, Some(token)) => Ok(AuthToken::new(
                token,
                body.expiracion.as_deref().and_then(parse_expiration),
            )),
            (true, None) => Err(PacApiError::Rejected {
                endpoint: endpoint.into(),
                code: code_label(body.codigo.as_ref()),
                message: "authentication succeeded without a session token".into(),
            }),
            (false, _) => Err(PacApiError::Rejected {
                endpoint: endpoint.into(),
                code: code_label(body.codigo.as_ref()),
                message: first_text(&[body.mensaje.as_ref()])
                    .unwrap_or_else(|| "authentication refused".into()),
            }),
        }
    }

    async fn submit(
        &self,
        env: Environment,
        token: &AuthToken,
        document: &Value,
    ) -> Result<SubmissionReceipt, PacApiError> {
        let endpoint = "POST /api/Enviar";
        let url = self.config.endpoint_url(env, SUBMIT_PATH);
        tracing::debug!(environment = %env, "submitting document to PAC");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token.as_str())
            .json(document)
            .send()
            .await
            .map_err(|e| PacApiError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let body: SubmitResponse = read_json(endpoint, resp).await?;

        let accepted = body.codigo.as_ref().is_some_and(PacCode::is_success);
        let cufe = body.cufe.as_deref().map(str::trim).filter(|c| !c.is_empty());
        match (accepted, cufe) {
            (true, Some(cufe)) => Ok(SubmissionReceipt {
                cufe: cufe.to_string(),
                message: first_text(&[body.mensaje.as_ref(), body.resultado.as_ref()])
                    .unwrap_or_else(|| "Document accepted by PAC".into()),
                qr: body.qr.filter(|q| !q.trim().is_empty()),
            }),
            (true, None) => Err(PacApiError::Rejected {
                endpoint: endpoint.into(),
                code: code_label(body.codigo.as_ref()),
                message: "submission accepted without a CUFE".into(),
            }),
            (false, _) => Err(PacApiError::Rejected {
                endpoint: endpoint.into(),
                code: code_label(body.codigo.as_ref()),
                message: first_text(&[body.mensaje.as_ref(), body.resultado.as_ref()])
                    .unwrap_or_else(|| "submission refused".into()),
            }),
        }
    }
}

/// Check the status line, then decode the body.
async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, PacApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        return Err(PacApiError::ApiError {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }

    resp.json().await.map_err(|e| PacApiError::Deserialization {
        endpoint: endpoint.into(),
        source: e,
    })
}
