use std::sync::Arc;

use crate::config::Config;
use crate::search::cache::SearchCache;
use crate::search::coordinator::SearchCoordinator;
use crate::search::salary::SalaryEstimator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchCoordinator>,
    /// Pluggable estimator. Default: LlmSalaryEstimator.
    pub salary: Arc<dyn SalaryEstimator>,
    /// Same cache the coordinator uses; salary estimates live here too.
    pub cache: Arc<dyn SearchCache>,
    pub config: Config,
}
