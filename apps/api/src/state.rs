use std::sync::Arc;

use crate::sync::service::JobSyncService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobSyncService>,
}
