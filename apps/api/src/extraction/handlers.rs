//! Axum route handlers for job extraction.
//!
//! `/api/extract-job` keeps the browser-facing contract of the jobs page:
//! soft failures are a 200 with `requiresManualInput`, credit refusals a 402
//! with `requiresCredits`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::extraction::{extract, Extraction, JobSource};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractJobRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub manual_text: Option<String>,
}

impl ExtractJobRequest {
    /// Pasted text wins over a URL when both are sent.
    pub fn source(self) -> Option<JobSource> {
        let non_blank = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        match (non_blank(self.manual_text), non_blank(self.url)) {
            (Some(text), _) => Some(JobSource::ManualText(text)),
            (None, Some(url)) => Some(JobSource::Url(url)),
            (None, None) => None,
        }
    }
}

/// Renders an extraction outcome in the jobs-page wire shape.
pub fn extraction_response(result: Result<Extraction, AppError>) -> Response {
    match result {
        Ok(Extraction::Extracted(job)) => Json(job).into_response(),
        Ok(Extraction::NeedsManualInput { message }) => Json(json!({
            "error": "scraping_blocked",
            "message": message,
            "requiresManualInput": true,
        }))
        .into_response(),
        Err(AppError::InsufficientCredits(message)) => (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({
                "error": "insufficient_credits",
                "message": message,
                "requiresCredits": true,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn missing_source() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "URL or manual text is required" })),
    )
        .into_response()
}

/// POST /api/extract-job
pub async fn handle_extract_job(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(request): Json<ExtractJobRequest>,
) -> Response {
    let Some(source) = request.source() else {
        return missing_source();
    };

    let result = extract(
        state.ai.as_ref(),
        state.fetcher.as_ref(),
        state.model.as_ref(),
        &ctx,
        source,
    )
    .await;

    extraction_response(result)
}

/// POST /api/v1/workspace/job/extract
///
/// Same contract as `/api/extract-job`; a successful extraction also becomes
/// the workspace's current job, which clears any stored match.
pub async fn handle_workspace_extract(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(request): Json<ExtractJobRequest>,
) -> Response {
    let Some(source) = request.source() else {
        return missing_source();
    };

    let result = extract(
        state.ai.as_ref(),
        state.fetcher.as_ref(),
        state.model.as_ref(),
        &ctx,
        source,
    )
    .await;

    if let Ok(Extraction::Extracted(job)) = &result {
        let job = job.clone();
        state
            .workspaces
            .update(ctx.user_id, |ws| ws.set_job(job))
            .await;
    }

    extraction_response(result)
}
