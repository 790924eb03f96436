//! # Company Administration Routes
//!
//! Operator endpoints behind the admin token: register tenants, configure
//! their PAC accounts, and manage the API keys their ERPs authenticate with.
//! Operators also resolve documents an interrupted submission left in
//! `processing`.
//! Read responses redact PAC passwords and API keys; a new key is shown in
//! full exactly once, in the response that issues it.

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use pacgate_core::{
    ApiKey, ApiKeyStatus, Company, CompanyId, Environment, FiscalDocument, PacAccount, PacConfig,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, parse_document_id, Validate};
use crate::state::AppState;

// -- DTOs ---------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyRequest {
    /// Tenant identifier, `[A-Za-z0-9_-]{1,128}`.
    pub id: String,
    pub name: String,
    pub ruc: Option<String>,
    pub pac_config: Option<PacConfig>,
}

impl Validate for CreateCompanyRequest {
    fn validate(&self) -> Result<(), String> {
        CompanyId::new(self.id.clone()).map_err(|e| e.to_string())?;
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }
}

/// PAC credentials for one environment.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPacAccountRequest {
    pub username: String,
    pub password: String,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
    pub max_documents_per_month: Option<u32>,
}

impl std::fmt::Debug for SetPacAccountRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetPacAccountRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .field("max_documents_per_month", &self.max_documents_per_month)
            .finish()
    }
}

impl Validate for SetPacAccountRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err("username and password must not be empty".to_string());
        }
        Ok(())
    }
}

/// A freshly issued API key. The only response that carries the full key.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKey {
    pub key: String,
    pub status: ApiKeyStatus,
    pub created_at: DateTime<Utc>,
}

/// How to resolve a document stuck in `processing`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReclaimRequest {
    /// CUFE the PAC issued, when the acceptance is known. Omit to return the
    /// document to `pending`.
    pub cufe: Option<String>,
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/companies", post(create_company))
        .route("/admin/companies/{id}", get(get_company))
        .route("/admin/companies/{id}/pac/{environment}", put(set_pac_account))
        .route("/admin/companies/{id}/api-keys", post(issue_api_key))
        .route("/admin/companies/{id}/api-keys/{key}", delete(revoke_api_key))
        .route("/admin/documents/{id}/reclaim", post(reclaim_document))
}

fn parse_company_id(raw: &str) -> Result<CompanyId, AppError> {
    CompanyId::new(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn load_company(state: &AppState, id: &CompanyId) -> Result<Company, AppError> {
    state
        .store
        .get_company(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("company {id} not found")))
}

// -- Handlers -----------------------------------------------------------------

/// POST /admin/companies: Register a tenant.
#[utoipa::path(
    post,
    path = "/admin/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company registered (secrets redacted)", body = Company),
        (status = 409, description = "Company id already taken", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid id or name", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_company(
    State(state): State<AppState>,
    body: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let req = extract_validated_json(body)?;
    let id = CompanyId::new(req.id).map_err(|e| AppError::Validation(e.to_string()))?;

    let mut company = Company::new(id, req.name.trim());
    company.ruc = req.ruc.filter(|r| !r.trim().is_empty());
    company.pac_config = req.pac_config.unwrap_or_default();

    let company = state.store.insert_company(company).await?;
    tracing::info!(company_id = %company.id, "company registered");
    Ok((StatusCode::CREATED, Json(company.redacted())))
}

/// GET /admin/companies/{id}: Read a tenant.
#[utoipa::path(
    get,
    path = "/admin/companies/{id}",
    params(("id" = String, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company found (secrets redacted)", body = Company),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Company>, AppError> {
    let id = parse_company_id(&id)?;
    Ok(Json(load_company(&state, &id).await?.redacted()))
}

/// PUT /admin/companies/{id}/pac/{environment}: Set PAC credentials.
///
/// The month's usage counter carries over from the previous account.
#[utoipa::path(
    put,
    path = "/admin/companies/{id}/pac/{environment}",
    params(
        ("id" = String, Path, description = "Company ID"),
        ("environment" = String, Path, description = "`demo` or `production`"),
    ),
    request_body = SetPacAccountRequest,
    responses(
        (status = 200, description = "Credentials stored (secrets redacted)", body = Company),
        (status = 400, description = "Unknown environment", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn set_pac_account(
    State(state): State<AppState>,
    Path((id, environment)): Path<(String, String)>,
    body: Result<Json<SetPacAccountRequest>, JsonRejection>,
) -> Result<Json<Company>, AppError> {
    let id = parse_company_id(&id)?;
    let env = Environment::from_str(&environment).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let req = extract_validated_json(body)?;

    // The store keeps the stored monthly usage for an existing account.
    let mut company = load_company(&state, &id).await?;
    company.pac_config.set_account(
        env,
        PacAccount {
            username: req.username.trim().to_string(),
            password: req.password,
            is_active: req.is_active.unwrap_or(true),
            max_documents_per_month: req.max_documents_per_month,
            documents_used_this_month: None,
        },
    );

    let company = state.store.update_company(&company).await?;
    tracing::info!(company_id = %company.id, environment = %env, "PAC credentials updated");
    Ok(Json(company.redacted()))
}

/// POST /admin/companies/{id}/api-keys: Issue an API key.
#[utoipa::path(
    post,
    path = "/admin/companies/{id}/api-keys",
    params(("id" = String, Path, description = "Company ID")),
    responses(
        (status = 201, description = "Key issued; the full key is only shown here", body = IssuedApiKey),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn issue_api_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<IssuedApiKey>), AppError> {
    let id = parse_company_id(&id)?;
    let mut company = load_company(&state, &id).await?;

    let key = ApiKey::generate();
    company.api_keys.push(key.clone());
    state.store.update_company(&company).await?;
    tracing::info!(company_id = %id, key = ?key, "API key issued");

    Ok((
        StatusCode::CREATED,
        Json(IssuedApiKey {
            key: key.key,
            status: key.status,
            created_at: key.created_at,
        }),
    ))
}

/// DELETE /admin/companies/{id}/api-keys/{key}: Revoke an API key.
#[utoipa::path(
    delete,
    path = "/admin/companies/{id}/api-keys/{key}",
    params(
        ("id" = String, Path, description = "Company ID"),
        ("key" = String, Path, description = "The API key to revoke"),
    ),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 404, description = "Unknown company or key", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let id = parse_company_id(&id)?;
    let mut company = load_company(&state, &id).await?;

    if !company.revoke_api_key(&key) {
        return Err(AppError::NotFound(format!("API key not found for company {id}")));
    }
    state.store.update_company(&company).await?;
    tracing::info!(company_id = %id, "API key revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/documents/{id}/reclaim: Resolve an interrupted submission.
#[utoipa::path(
    post,
    path = "/admin/documents/{id}/reclaim",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    request_body = ReclaimRequest,
    responses(
        (status = 200, description = "Document recorded as accepted, or back to pending", body = FiscalDocument),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Document is not processing", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reclaim_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReclaimRequest>, JsonRejection>,
) -> Result<Json<FiscalDocument>, AppError> {
    let id = parse_document_id(&id)?;
    let cufe = extract_json(body)?
        .cufe
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let document = state.orchestrator().reclaim(id, cufe).await?;
    tracing::info!(document_id = %id, status = %document.status, "document reclaimed");
    Ok(Json(document))
}
