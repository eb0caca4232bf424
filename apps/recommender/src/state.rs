use std::sync::Arc;

use crate::datasource::ResilientDataSource;
use crate::lifecycle::ModelLifecycleManager;
use crate::recommendation::RecommendationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub lifecycle: Arc<ModelLifecycleManager>,
    /// Kept for circuit state reporting.
    pub data_source: Arc<ResilientDataSource>,
}
