pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;
use crate::sync::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job postings
        .route(
            "/api/v1/jobs/:id",
            patch(handlers::handle_update_job).delete(handlers::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:id/toggle-status",
            post(handlers::handle_toggle_status),
        )
        .route("/api/v1/jobs/:id/reembed", post(handlers::handle_reembed_job))
        .route(
            "/api/v1/jobs/:id/vector-metadata",
            put(handlers::handle_update_job_vector_metadata),
        )
        // Candidates
        .route(
            "/api/v1/applications",
            post(handlers::handle_record_application),
        )
        .route(
            "/api/v1/resumes/:id/content",
            put(handlers::handle_reembed_resume),
        )
        .route(
            "/api/v1/resumes/:id/matches",
            get(handlers::handle_find_matches),
        )
        // Moderation
        .route("/api/v1/admin/users/:id/ban", post(handlers::handle_ban_user))
        .route(
            "/api/v1/admin/users/:id/unban",
            post(handlers::handle_unban_user),
        )
        .route(
            "/api/v1/admin/users/:id/ban-status",
            get(handlers::handle_user_ban_status),
        )
        .route(
            "/api/v1/admin/companies/:id/ban",
            post(handlers::handle_ban_company),
        )
        .route(
            "/api/v1/admin/companies/:id/unban",
            post(handlers::handle_unban_company),
        )
        .route(
            "/api/v1/admin/companies/:id/ban-status",
            get(handlers::handle_company_ban_status),
        )
        .with_state(state)
}
