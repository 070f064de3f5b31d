//! Axum route handlers for the Workspace API.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::generation::ContentKind;
use crate::handoff::{self, HandoffHandle};
use crate::state::AppState;
use crate::workflow::matching::{compute_match, MatchResult};
use crate::workflow::{hydrate, WorkspaceView};

#[derive(Debug, Deserialize)]
pub struct HandoffRequest {
    pub kind: ContentKind,
}

/// GET /api/v1/workspace
///
/// Current resume, job, valid match and drafts, plus a fresh credit balance.
pub async fn handle_get_workspace(
    State(state): State<AppState>,
    mut ctx: AuthContext,
) -> Result<Json<WorkspaceView>, AppError> {
    hydrate(&state.db, &state.workspaces, ctx.user_id).await?;
    ctx.refresh_credits(state.ai.as_ref()).await;

    let view = state
        .workspaces
        .read(ctx.user_id, |ws| ws.view(ctx.credits))
        .await;
    Ok(Json(view))
}

/// POST /api/v1/workspace/match
pub async fn handle_compute_match(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<MatchResult>, AppError> {
    hydrate(&state.db, &state.workspaces, ctx.user_id).await?;
    let result = compute_match(state.ai.as_ref(), &state.workspaces, &ctx).await?;
    Ok(Json(result))
}

/// DELETE /api/v1/workspace/job
pub async fn handle_clear_job(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> StatusCode {
    state
        .workspaces
        .update(ctx.user_id, |ws| ws.clear_job())
        .await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/workspace/handoff
///
/// Packs the current job, resume and match for a generator page.
pub async fn handle_prepare_handoff(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(request): Json<HandoffRequest>,
) -> Result<Json<HandoffHandle>, AppError> {
    hydrate(&state.db, &state.workspaces, ctx.user_id).await?;
    let handle = handoff::prepare(
        state.handoff.as_ref(),
        &state.workspaces,
        ctx.user_id,
        request.kind,
        Duration::from_secs(state.config.handoff_ttl_secs),
    )
    .await?;
    Ok(Json(handle))
}
