//! # pacgate-api -- Binary Entry Point
//!
//! Reads configuration from the environment, connects the Status Store
//! (PostgreSQL when `DATABASE_URL` is set, in-memory otherwise), seeds
//! companies, and serves the API.

use std::sync::Arc;

use anyhow::Context;
use pacgate_api::config::{AppConfig, LogFormat};
use pacgate_api::middleware::metrics::ApiMetrics;
use pacgate_api::state::AppState;
use pacgate_api::store::memory::MemoryStore;
use pacgate_api::store::postgres::PgStatusStore;
use pacgate_api::store::StatusStore;
use pacgate_core::DocumentMapper;
use pacgate_pac_client::PacClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid service configuration")?;
    init_tracing(config.log_format);
    tracing::info!(?config, "starting pacgate-api");
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; /admin routes are unauthenticated");
    }

    let pac = PacClient::from_env().context("invalid PAC client configuration")?;
    tracing::info!(
        demo = %pac.config().demo_url,
        production = %pac.config().production_url,
        timeout_secs = pac.config().timeout_secs,
        "PAC client configured"
    );

    let pool = pacgate_api::db::init_pool(
        config.database_url.as_ref().map(|url| url.as_str()),
        config.db_max_connections,
    )
    .await
    .context("database initialization failed")?;

    let store: Arc<dyn StatusStore> = match pool {
        Some(pool) => Arc::new(PgStatusStore::new(pool)),
        None => Arc::new(MemoryStore::new()),
    };

    if let Some(path) = &config.companies_seed_file {
        pacgate_api::bootstrap::seed_companies(store.as_ref(), path)
            .await
            .context("company seeding failed")?;
    }

    let mapper = DocumentMapper::with_embedded_schema().context("document schema failed to load")?;
    let metrics = ApiMetrics::new().context("metrics registry failed to initialize")?;

    let port = config.port;
    let state = AppState::new(config, store, Arc::new(pac), mapper, metrics);
    let app = pacgate_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("pacgate-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Plain => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
