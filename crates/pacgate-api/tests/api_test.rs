//! Router-level tests: every route through `app()` with the real
//! middleware stack, a memory store and a scripted PAC.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use pacgate_api::auth::SecretToken;
use pacgate_api::config::AppConfig;
use pacgate_api::extractors::parse_document_id;
use pacgate_api::store::StatusStore;
use pacgate_core::DocumentStatus;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{
    harness, harness_with_config, stored_documents, valid_payload, FakeGateway, Harness,
    PacBehavior, CUFE,
};

const ADMIN_TOKEN: &str = "operator-secret";

async fn accepting() -> (Router, Harness) {
    let h = harness(FakeGateway::new(PacBehavior::Accept)).await;
    (pacgate_api::app(h.state.clone()), h)
}

async fn with_admin_token() -> (Router, Harness) {
    let config = AppConfig {
        admin_token: Some(SecretToken::new(ADMIN_TOKEN)),
        ..AppConfig::default()
    };
    let h = harness_with_config(FakeGateway::new(PacBehavior::Accept), config).await;
    (pacgate_api::app(h.state.clone()), h)
}

fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// POST a valid document and return its id.
async fn receive(app: &Router, api_key: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/documents", Some(api_key), Some(valid_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["documentId"]
        .as_str()
        .unwrap()
        .to_string()
}

// ── Health, metrics, OpenAPI ─────────────────────────────────────────

#[tokio::test]
async fn health_probes_need_no_credentials() {
    let (app, _h) = accepting().await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health/liveness", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");

    let response = app
        .oneshot(request(Method::GET, "/health/readiness", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn metrics_expose_request_and_document_counters() {
    let (app, h) = accepting().await;
    receive(&app, &h.api_key).await;

    let response = app
        .oneshot(request(Method::GET, "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let text = body_string(response).await;
    assert!(text.contains("pacgate_http_requests_total"));
    assert!(text.contains("pacgate_documents_received_total 1"));
    assert_eq!(h.state.metrics.documents_received(), 1);
}

#[tokio::test]
async fn openapi_document_lists_routes() {
    let (app, _h) = accepting().await;
    let response = app
        .oneshot(request(Method::GET, "/openapi.json", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/documents"].is_object());
    assert!(doc["paths"]["/documents/{id}/submit"]["post"].is_object());
    assert!(doc["paths"]["/admin/companies/{id}/pac/{environment}"]["put"].is_object());
}

// ── Tenant authentication ────────────────────────────────────────────

#[tokio::test]
async fn documents_require_an_api_key() {
    let (app, _h) = accepting().await;

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/documents", None, Some(valid_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");

    let response = app
        .oneshot(request(Method::GET, "/documents", Some("pgk_unknown"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["message"], "invalid API key");
}

#[tokio::test]
async fn revoked_key_is_refused() {
    let (app, h) = accepting().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/admin/companies/acme/api-keys/{}", h.api_key),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(Method::POST, "/documents", Some(&h.api_key), Some(valid_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(stored_documents(&h.store).await, 0);
}

// ── Document intake ──────────────────────────────────────────────────

#[tokio::test]
async fn valid_document_is_stored_pending() {
    let (app, h) = accepting().await;

    let response = app
        .oneshot(request(Method::POST, "/documents", Some(&h.api_key), Some(valid_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let receipt = body_json(response).await;
    assert_eq!(receipt["status"], "pending");

    let id = parse_document_id(receipt["documentId"].as_str().unwrap()).unwrap();
    let stored = h.store.get_document(id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Pending);
    assert_eq!(stored.amount, "107.00");
    assert_eq!(stored.client, "Distribuidora Istmo S.A.");
    assert_eq!(stored.original_data, valid_payload());
    assert_eq!(stored.status_history.len(), 1);
}

#[tokio::test]
async fn schema_violations_are_reported_per_field() {
    let (app, h) = accepting().await;
    let mut payload = valid_payload();
    payload["documento"]["datosTransaccion"]
        .as_object_mut()
        .unwrap()
        .remove("cliente");

    let response = app
        .oneshot(request(Method::POST, "/documents", Some(&h.api_key), Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let details = body["error"]["details"].as_array().unwrap();
    assert!(!details.is_empty());
    assert!(details.iter().all(|v| v["field"].is_string() && v["message"].is_string()));
    assert_eq!(stored_documents(&h.store).await, 0);
}

#[tokio::test]
async fn malformed_json_is_a_root_violation() {
    let (app, h) = accepting().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/documents")
        .header(header::AUTHORIZATION, format!("Bearer {}", h.api_key))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"documento\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "");
}

// ── Document queries ─────────────────────────────────────────────────

#[tokio::test]
async fn list_and_stats_reflect_received_documents() {
    let (app, h) = accepting().await;
    receive(&app, &h.api_key).await;
    receive(&app, &h.api_key).await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/documents?limit=1", Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["limit"], 1);
    assert_eq!(page["documents"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/documents?status=rejected", Some(&h.api_key), None))
        .await
        .unwrap();
    assert!(body_json(response).await["documents"].as_array().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/documents?status=lost", Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(request(Method::GET, "/documents/stats", Some(&h.api_key), None))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["byStatus"]["pending"], 2);
    assert_eq!(stats["byStatus"]["sent_to_pac"], 0);
}

#[tokio::test]
async fn get_document_by_id() {
    let (app, h) = accepting().await;
    let id = receive(&app, &h.api_key).await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, &format!("/documents/{id}"), Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["id"], id.as_str());
    assert_eq!(doc["companyId"], "acme");
    assert_eq!(doc["statusHistory"][0]["step"], "received");

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/documents/not-a-uuid", Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/documents/{}", uuid::Uuid::new_v4()),
            Some(&h.api_key),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_tenants_documents_are_invisible() {
    let (app, h) = accepting().await;
    let id = receive(&app, &h.api_key).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/admin/companies",
            None,
            Some(json!({"id": "globex", "name": "Globex Corp"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/admin/companies/globex/api-keys", None, None))
        .await
        .unwrap();
    let other_key = body_json(response).await["key"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(Method::GET, &format!("/documents/{id}"), Some(&other_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit"),
            Some(&other_key),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request(Method::GET, "/documents", Some(&other_key), None))
        .await
        .unwrap();
    assert!(body_json(response).await["documents"].as_array().unwrap().is_empty());
}

// ── Submission ───────────────────────────────────────────────────────

#[tokio::test]
async fn submit_then_resubmit_conflicts() {
    let (app, h) = accepting().await;
    let id = receive(&app, &h.api_key).await;
    let uri = format!("/documents/{id}/submit");

    let response = app
        .clone()
        .oneshot(request(Method::POST, &uri, Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["document"]["status"], "sent_to_pac");
    assert_eq!(outcome["document"]["cufe"], CUFE);

    let response = app
        .oneshot(request(Method::POST, &uri, Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn pac_rejection_is_a_successful_response() {
    let h = harness(FakeGateway::new(PacBehavior::FailSubmit("Documento duplicado"))).await;
    let app = pacgate_api::app(h.state.clone());
    let id = receive(&app, &h.api_key).await;

    let response = app
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit"),
            Some(&h.api_key),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["document"]["status"], "rejected");
    assert!(outcome["document"]["errorDetails"]
        .as_str()
        .unwrap()
        .contains("Documento duplicado"));
}

#[tokio::test]
async fn submit_environment_is_validated() {
    let (app, h) = accepting().await;
    let id = receive(&app, &h.api_key).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit?environment=staging"),
            Some(&h.api_key),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No production account configured for the seeded company.
    let response = app
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit?environment=production"),
            Some(&h.api_key),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "CONFIGURATION_ERROR");

    let doc = h
        .store
        .get_document(parse_document_id(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.status, DocumentStatus::Pending);
}

// ── Administration ───────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_require_the_token_when_configured() {
    let (app, _h) = with_admin_token().await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/admin/companies/acme", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/admin/companies/acme", Some("wrong"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request(Method::GET, "/admin/companies/acme", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_key_does_not_open_admin_routes() {
    let (app, h) = with_admin_token().await;
    let response = app
        .oneshot(request(Method::GET, "/admin/companies/acme", Some(&h.api_key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn company_lifecycle() {
    let (app, _h) = with_admin_token().await;
    let admin = Some(ADMIN_TOKEN);

    let create = json!({"id": "globex", "name": "Globex Corp", "ruc": "8-123-456"});
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/admin/companies", admin, Some(create.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["name"], "Globex Corp");

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/admin/companies", admin, Some(create)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/admin/companies",
            admin,
            Some(json!({"id": "bad id!", "name": "x"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/admin/companies/globex/pac/demo",
            admin,
            Some(json!({"username": "8-123-456", "password": "pac-secret", "maxDocumentsPerMonth": 100})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let company = body_json(response).await;
    assert_eq!(company["pacConfig"]["demo"]["username"], "8-123-456");
    assert_eq!(company["pacConfig"]["demo"]["password"], "[REDACTED]");
    assert_eq!(company["pacConfig"]["demo"]["maxDocumentsPerMonth"], 100);

    let response = app
        .clone()
        .oneshot(request(Method::PUT, "/admin/companies/globex/pac/staging", admin, Some(json!({"username": "u", "password": "p"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/admin/companies/globex/api-keys", admin, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let issued = body_json(response).await;
    let key = issued["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("pgk_"));
    assert_eq!(issued["status"], "active");

    // The new key works for tenant routes.
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/documents", Some(&key), Some(valid_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Reads never show the full key or password.
    let response = app
        .clone()
        .oneshot(request(Method::GET, "/admin/companies/globex", admin, None))
        .await
        .unwrap();
    let text = body_string(response).await;
    assert!(!text.contains(&key));
    assert!(!text.contains("pac-secret"));

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/admin/companies/globex/api-keys/{key}"),
            admin,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            "/admin/companies/globex/api-keys/pgk_missing",
            admin,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request(Method::GET, "/documents", Some(&key), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_company_is_not_found() {
    let (app, _h) = accepting().await;
    let response = app
        .oneshot(request(Method::GET, "/admin/companies/nobody", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn operator_reclaims_a_stuck_document() {
    let (app, h) = with_admin_token().await;
    let id = receive(&app, &h.api_key).await;
    let uri = format!("/admin/documents/{id}/reclaim");

    // A pending document has nothing to reclaim.
    let response = app
        .clone()
        .oneshot(request(Method::POST, &uri, Some(ADMIN_TOKEN), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let document_id = parse_document_id(&id).unwrap();
    let mut stuck = h.store.get_document(document_id).await.unwrap().unwrap();
    let version = stuck.version;
    stuck.begin_submission(chrono::Utc::now());
    h.store.update_document(&stuck, version).await.unwrap();

    let response = app
        .clone()
        .oneshot(request(Method::POST, &uri, Some(&h.api_key), Some(json!({"cufe": CUFE}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request(Method::POST, &uri, Some(ADMIN_TOKEN), Some(json!({"cufe": CUFE}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["status"], "sent_to_pac");
    assert_eq!(doc["cufe"], CUFE);
}
