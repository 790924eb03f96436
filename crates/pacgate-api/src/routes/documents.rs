//! # Document Routes
//!
//! Everything here runs behind the tenant API key middleware and only ever
//! sees the authenticated company's documents. A document owned by another
//! tenant is indistinguishable from a missing one.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use pacgate_core::{DocumentStatus, DocumentType, Environment, FiscalDocument};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::TenantContext;
use crate::error::AppError;
use crate::extractors::{extract_document_json, extract_query, parse_document_id};
use crate::orchestration::SubmissionOutcome;
use crate::state::AppState;
use crate::store::{DocumentFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// -- DTOs ---------------------------------------------------------------------

/// Response to an accepted inbound document.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReceipt {
    #[schema(value_type = String, format = Uuid)]
    pub document_id: pacgate_core::DocumentId,
    pub status: DocumentStatus,
}

/// Listing row: a document without its payload and history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[schema(value_type = String, format = Uuid)]
    pub id: pacgate_core::DocumentId,
    pub document_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    pub status: DocumentStatus,
    pub amount: String,
    pub client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cufe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FiscalDocument> for DocumentSummary {
    fn from(doc: FiscalDocument) -> Self {
        Self {
            id: doc.id,
            document_type: doc.document_type,
            document_number: doc.document_number,
            status: doc.status,
            amount: doc.amount,
            client: doc.client,
            cufe: doc.cufe,
            error_details: doc.error_details,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentList {
    pub documents: Vec<DocumentSummary>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total: u64,
    /// Count per status; every status is present.
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDocumentsQuery {
    /// Only documents in this status.
    pub status: Option<String>,
    /// Page size (default 50, max 200).
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubmitQuery {
    /// `demo` or `production`. Defaults to `PAC_DEFAULT_ENVIRONMENT`.
    pub environment: Option<String>,
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", post(receive_document).get(list_documents))
        .route("/documents/stats", get(document_stats))
        .route("/documents/{id}", get(get_document))
        .route("/documents/{id}/submit", post(submit_document))
}

// -- Handlers -----------------------------------------------------------------

/// POST /documents: Accept a fiscal document from the tenant's ERP.
///
/// Validates and maps the payload, stores it as `pending`, and returns
/// immediately. Submission to the PAC is a separate step.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content = serde_json::Value, description = "PAC document (`{\"documento\": {...}}`)"),
    responses(
        (status = 202, description = "Document stored as pending", body = DocumentReceipt),
        (status = 400, description = "Malformed JSON or schema violations", body = crate::error::ErrorBody),
        (status = 401, description = "Missing, unknown or revoked API key", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn receive_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentReceipt>), AppError> {
    let payload = extract_document_json(body)?;
    let new = state.mapper.map(&tenant.company_id, &payload).map_err(|errors| {
        tracing::info!(
            company_id = %tenant.company_id,
            violations = errors.len(),
            "inbound document rejected"
        );
        AppError::from(errors)
    })?;

    let document = state.store.create_document(new).await?;
    state.metrics.record_document_received();
    tracing::info!(
        company_id = %tenant.company_id,
        document_id = %document.id,
        document_type = %document.document_type,
        "document received"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DocumentReceipt {
            document_id: document.id,
            status: document.status,
        }),
    ))
}

/// GET /documents: List the tenant's documents, newest first.
#[utoipa::path(
    get,
    path = "/documents",
    params(ListDocumentsQuery),
    responses(
        (status = 200, description = "One page of documents", body = DocumentList),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    tenant: TenantContext,
    query: Result<Query<ListDocumentsQuery>, QueryRejection>,
) -> Result<Json<DocumentList>, AppError> {
    let query = extract_query(query)?;
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            DocumentStatus::parse(raw.trim())
                .ok_or_else(|| AppError::BadRequest(format!("unknown document status \"{raw}\"")))
        })
        .transpose()?;

    let filter = DocumentFilter {
        status,
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset: query.offset.unwrap_or(0),
    };

    let documents = state
        .store
        .list_documents(&tenant.company_id, filter)
        .await?
        .into_iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentList {
        documents,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// GET /documents/stats: Document counts per status.
#[utoipa::path(
    get,
    path = "/documents/stats",
    responses((status = 200, description = "Counts per status", body = DocumentStats)),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn document_stats(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<DocumentStats>, AppError> {
    let counts = state
        .store
        .count_documents_by_status(&tenant.company_id)
        .await?;
    Ok(Json(DocumentStats {
        total: counts.values().sum(),
        by_status: counts
            .into_iter()
            .map(|(status, n)| (status.to_string(), n))
            .collect(),
    }))
}

/// GET /documents/{id}: One document with its full history.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    responses(
        (status = 200, description = "Document found", body = FiscalDocument),
        (status = 400, description = "Malformed document id", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn get_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> Result<Json<FiscalDocument>, AppError> {
    let id = parse_document_id(&id)?;
    match state.store.get_document(id).await? {
        Some(doc) if doc.company_id == tenant.company_id => Ok(Json(doc)),
        _ => Err(AppError::NotFound(format!("document {id} not found"))),
    }
}

/// POST /documents/{id}/submit: Submit a pending document to the PAC.
///
/// PAC failures are not HTTP errors: the response is 200 with
/// `success: false` and the document is `rejected` with the reason recorded.
#[utoipa::path(
    post,
    path = "/documents/{id}/submit",
    params(
        ("id" = String, Path, description = "Document ID (UUID)"),
        SubmitQuery,
    ),
    responses(
        (status = 200, description = "Submission finished (see `success`)", body = SubmissionOutcome),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Document is not pending", body = crate::error::ErrorBody),
        (status = 422, description = "PAC credentials not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn submit_document(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
    query: Result<Query<SubmitQuery>, QueryRejection>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let id = parse_document_id(&id)?;
    let env = match extract_query(query)?.environment {
        Some(raw) => Environment::from_str(&raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => state.config.default_environment,
    };

    let outcome = state
        .orchestrator()
        .submit_claimed(&tenant.company_id, id, env)
        .await?;
    Ok(Json(outcome))
}
