use std::sync::Arc;

use crate::analysis::orchestrator::AnalysisOrchestrator;
use crate::config::Config;
use crate::storage::StorageGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageGateway,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub config: Config,
}
