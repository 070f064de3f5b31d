pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::credits::handlers as credits;
use crate::extraction::handlers as extraction;
use crate::generation::handlers as content;
use crate::resume::{self, handlers as resumes};
use crate::state::AppState;
use crate::tracking::handlers as tracking;
use crate::workflow::handlers as workspace;

/// Multipart framing on top of the largest accepted PDF.
const UPLOAD_BODY_LIMIT: usize = resume::MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job extraction (jobs-page contract)
        .route("/api/extract-job", post(extraction::handle_extract_job))
        // Workspace API
        .route("/api/v1/workspace", get(workspace::handle_get_workspace))
        .route(
            "/api/v1/workspace/job/extract",
            post(extraction::handle_workspace_extract),
        )
        .route("/api/v1/workspace/job", delete(workspace::handle_clear_job))
        .route(
            "/api/v1/workspace/match",
            post(workspace::handle_compute_match),
        )
        .route(
            "/api/v1/workspace/handoff",
            post(workspace::handle_prepare_handoff),
        )
        // Resume API
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/resumes/current", get(resumes::handle_get_current))
        .route("/api/v1/resumes/:id/url", get(resumes::handle_signed_url))
        .route(
            "/api/v1/resumes/:id/parse",
            post(resumes::handle_retry_parse),
        )
        // Content API
        .route(
            "/api/v1/content/:token",
            post(content::handle_generate_from_handoff),
        )
        .route(
            "/api/v1/content/drafts/:id",
            get(content::handle_get_draft)
                .put(content::handle_edit_draft)
                .delete(content::handle_delete_draft),
        )
        .route(
            "/api/v1/content/drafts/:id/regenerate",
            post(content::handle_regenerate_draft),
        )
        .route(
            "/api/v1/content/drafts/:id/download",
            get(content::handle_download_draft),
        )
        // Credits API
        .route("/api/v1/credits", get(credits::handle_get_credits))
        .route("/api/v1/credits/quote", get(credits::handle_quote))
        // Applications API
        .route(
            "/api/v1/applications",
            get(tracking::handle_list).post(tracking::handle_confirm_applied),
        )
        .route("/api/v1/applications/board", get(tracking::handle_board))
        .route(
            "/api/v1/applications/:id",
            patch(tracking::handle_update_status).delete(tracking::handle_delete),
        )
        .with_state(state)
}
