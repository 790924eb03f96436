//! # pacgate-api -- HTTP Service for the PAC Gateway
//!
//! Receives fiscal documents from tenant ERPs, keeps their processing
//! history, and submits them to a PAC (Proveedor Autorizado de
//! Certificación) on request.
//!
//! ## API Surface
//!
//! | Prefix            | Auth          | Module                  |
//! |-------------------|---------------|-------------------------|
//! | `/documents*`     | tenant API key | [`routes::documents`]  |
//! | `/admin/*`        | admin token    | [`routes::companies`]  |
//! | `/health/*`       | none           | this module            |
//! | `/metrics`        | none           | this module            |
//! | `/openapi.json`   | none           | [`openapi`]            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → (tenant | admin) auth → Handler
//! ```

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod orchestration;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router.
///
/// Health probes, `/metrics` and `/openapi.json` are mounted outside the
/// auth middleware so they stay reachable without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.admin_token.clone(),
    };

    let tenant = routes::documents::router().layer(from_fn_with_state(
        state.clone(),
        auth::tenant_auth_middleware,
    ));

    let admin = routes::companies::router().layer(from_fn(auth::admin_auth_middleware));

    let open = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics))
        .merge(openapi::router());

    Router::new()
        .merge(tenant)
        .merge(admin)
        .merge(open)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(state.metrics.clone()))
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 when the Status Store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

/// Prometheus text exposition.
async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => error::AppError::Internal(e).into_response(),
    }
}
