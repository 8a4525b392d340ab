pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::analysis::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and the text fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resumes",
            get(handlers::handle_list_resumes).post(handlers::handle_analyze),
        )
        .route("/api/v1/resumes/:id", get(handlers::handle_get_resume))
        .route(
            "/api/v1/resumes/:id/document",
            get(handlers::handle_get_document),
        )
        .route(
            "/api/v1/resumes/:id/preview",
            get(handlers::handle_get_preview),
        )
        .route("/api/v1/uploads", get(handlers::handle_list_uploads))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
