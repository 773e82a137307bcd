use crate::application::insight_service::InsightService;
use std::sync::Arc;

/// Shared handler state. Cloned per request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<InsightService>,
}

impl AppState {
    pub fn new(service: Arc<InsightService>) -> Self {
        Self { service }
    }
}
