//! # OpenAPI Document
//!
//! Assembles the utoipa-annotated routes into one OpenAPI 3.1 document,
//! served unauthenticated at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Registers the `bearer_auth` scheme used by both tenant API keys and the
/// admin token.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PAC Gateway API",
        version = "0.1.0",
        description = "Receives fiscal documents from tenant ERPs, stores them, and submits them to a PAC for certification."
    ),
    paths(
        // Tenant documents
        crate::routes::documents::receive_document,
        crate::routes::documents::list_documents,
        crate::routes::documents::document_stats,
        crate::routes::documents::get_document,
        crate::routes::documents::submit_document,
        // Administration
        crate::routes::companies::create_company,
        crate::routes::companies::get_company,
        crate::routes::companies::set_pac_account,
        crate::routes::companies::issue_api_key,
        crate::routes::companies::revoke_api_key,
        crate::routes::companies::reclaim_document,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        pacgate_core::FiscalDocument,
        pacgate_core::ProcessingStep,
        pacgate_core::DocumentStatus,
        pacgate_core::DocumentType,
        pacgate_core::StepKind,
        pacgate_core::StepStatus,
        pacgate_core::FieldViolation,
        pacgate_core::Company,
        pacgate_core::PacConfig,
        pacgate_core::PacAccount,
        pacgate_core::ApiKey,
        pacgate_core::ApiKeyStatus,
        pacgate_core::Environment,
        crate::orchestration::SubmissionOutcome,
        crate::routes::documents::DocumentReceipt,
        crate::routes::documents::DocumentSummary,
        crate::routes::documents::DocumentList,
        crate::routes::documents::DocumentStats,
        crate::routes::companies::CreateCompanyRequest,
        crate::routes::companies::SetPacAccountRequest,
        crate::routes::companies::IssuedApiKey,
        crate::routes::companies::ReclaimRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "documents", description = "Tenant document intake, dashboard and submission"),
        (name = "admin", description = "Tenant, PAC account and API key administration, document recovery"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
