//! End to end: an ERP posts a document and submits it, and the HTTP PAC
//! client talks to a mock PAC server.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use pacgate_pac_client::{PacApiConfig, PacClient};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{harness, valid_payload, CUFE};

fn request(method: Method, uri: &str, api_key: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {api_key}"));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/Autenticacion"))
        .and(body_json(json!({"usuario": "155596713-2-2015", "clave": "demo-password"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "codigo": 200,
            "mensaje": "Autenticacion exitosa",
            "token": "pac-session"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn document_flows_from_erp_to_pac() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/Enviar"))
        .and(header_eq("authorization", "Bearer pac-session"))
        .and(body_json(valid_payload()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "codigo": "200",
            "resultado": "procesado",
            "mensaje": "Documento recibido",
            "cufe": CUFE
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PacClient::new(PacApiConfig::local_mock(&server.uri()).unwrap()).unwrap();
    let h = harness(Arc::new(client)).await;
    let app = pacgate_api::app(h.state.clone());

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/documents", &h.api_key, Some(valid_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = json_body(response).await["documentId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit?environment=demo"),
            &h.api_key,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["message"], "Documento recibido");

    let response = app
        .oneshot(request(Method::GET, &format!("/documents/{id}"), &h.api_key, None))
        .await
        .unwrap();
    let doc = json_body(response).await;
    assert_eq!(doc["status"], "sent_to_pac");
    assert_eq!(doc["cufe"], CUFE);
    let steps: Vec<&str> = doc["statusHistory"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["step"].as_str().unwrap())
        .collect();
    assert_eq!(steps, ["received", "sent_to_pac", "pac_response"]);
}

#[tokio::test]
async fn pac_business_rejection_marks_document_rejected() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/Enviar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "codigo": "102",
            "resultado": "error",
            "mensaje": "El RUC del receptor no existe"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PacClient::new(PacApiConfig::local_mock(&server.uri()).unwrap()).unwrap();
    let h = harness(Arc::new(client)).await;
    let app = pacgate_api::app(h.state.clone());

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/documents", &h.api_key, Some(valid_payload())))
        .await
        .unwrap();
    let id = json_body(response).await["documentId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit"),
            &h.api_key,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["document"]["status"], "rejected");
    let details = outcome["document"]["errorDetails"].as_str().unwrap();
    assert!(details.starts_with("Submission failed"));
    assert!(details.contains("El RUC del receptor no existe"));
}

#[tokio::test]
async fn unreachable_pac_rejects_at_authentication() {
    let client = PacClient::new(PacApiConfig::local_mock("http://127.0.0.1:1").unwrap()).unwrap();
    let h = harness(Arc::new(client)).await;
    let app = pacgate_api::app(h.state.clone());

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/documents", &h.api_key, Some(valid_payload())))
        .await
        .unwrap();
    let id = json_body(response).await["documentId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(request(
            Method::POST,
            &format!("/documents/{id}/submit"),
            &h.api_key,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["success"], false);
    assert!(outcome["document"]["errorDetails"]
        .as_str()
        .unwrap()
        .starts_with("Authentication failed"));
}
