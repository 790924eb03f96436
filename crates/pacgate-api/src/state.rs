//! # Application State
//!
//! Everything a handler needs, constructed once at startup and shared by
//! cloning. External handles (store, PAC gateway) are injected here rather
//! than reached through globals, so tests can swap in fakes.

use std::sync::Arc;

use pacgate_core::DocumentMapper;
use pacgate_pac_client::PacGateway;

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::orchestration::SubmissionOrchestrator;
use crate::store::StatusStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StatusStore>,
    pub gateway: Arc<dyn PacGateway>,
    pub mapper: Arc<DocumentMapper>,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StatusStore>,
        gateway: Arc<dyn PacGateway>,
        mapper: DocumentMapper,
        metrics: ApiMetrics,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            gateway,
            mapper: Arc::new(mapper),
            metrics,
        }
    }

    /// An orchestrator sharing this state's store, gateway and metrics.
    pub fn orchestrator(&self) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.gateway),
            self.metrics.clone(),
        )
    }
}
