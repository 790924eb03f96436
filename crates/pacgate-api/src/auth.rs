//! # Authentication Middleware
//!
//! Two credentials guard the API:
//!
//! - **Tenant API keys** (`Authorization: Bearer pgk_...`) authenticate an
//!   ERP against the `/documents` routes. The key is looked up in the Status
//!   Store; only `active` keys resolve. A resolved key injects a
//!   [`TenantContext`] into the request extensions, which handlers extract.
//! - **Admin token** (`ADMIN_TOKEN`) guards `/admin`. When unset, the admin
//!   routes are open (development mode).
//!
//! Credentials are compared in constant time and never logged.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pacgate_core::CompanyId;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::AppState;

// ── Secrets ─────────────────────────────────────────────────────────────────

/// A secret string, zeroed on drop and redacted in `Debug`.
#[derive(Clone)]
pub struct SecretToken(Zeroizing<String>);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

// ── Admin auth ──────────────────────────────────────────────────────────────

/// Admin auth configuration injected into request extensions.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token: Option<SecretToken>,
}

/// Constant-time comparison of credentials.
///
/// When lengths differ, a dummy comparison runs so timing does not reveal
/// the expected length.
pub fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Pull the bearer credential out of the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing authorization header")?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("authorization header must use Bearer scheme")
}

/// Guard for `/admin` routes.
///
/// Allows every request when `AuthConfig.token` is `None`.
pub async fn admin_auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|cfg| cfg.token.clone());

    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let verdict = match bearer_token(request.headers()) {
        Ok(provided) if constant_time_token_eq(provided, expected.as_str()) => Ok(()),
        Ok(_) => Err("invalid bearer token"),
        Err(msg) => Err(msg),
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(msg) => {
            tracing::warn!(reason = msg, "admin authentication failed");
            unauthorized_response(msg)
        }
    }
}

// ── Tenant auth ─────────────────────────────────────────────────────────────

/// The company an authenticated API key belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub company_id: CompanyId,
}

/// Extracts the tenant injected by [`tenant_auth_middleware`]. Returns 401
/// if the middleware did not run.
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no tenant in request context".into()))
    }
}

/// Resolve the bearer API key to its company.
///
/// Missing, unknown and revoked keys all get 401 and nothing downstream
/// runs. A store failure is a 500.
pub async fn tenant_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let provided = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(msg) => {
            tracing::warn!(reason = msg, "tenant authentication failed");
            return unauthorized_response(msg);
        }
    };
    let provided = Zeroizing::new(provided);

    match state.store.find_company_by_api_key(&provided).await {
        Ok(Some(company)) => {
            tracing::debug!(company_id = %company.id, "tenant authenticated");
            request.extensions_mut().insert(TenantContext {
                company_id: company.id,
            });
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!("tenant authentication failed: unknown or revoked API key");
            unauthorized_response("invalid API key")
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
