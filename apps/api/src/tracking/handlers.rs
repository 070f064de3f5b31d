use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::state::AppState;
use crate::tracking::{self, Board, NewApplication};

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmAppliedRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /api/v1/applications
///
/// Records that the user applied to the workspace's current job. The body
/// (`{"url": ...}`) is optional.
pub async fn handle_confirm_applied(
    State(state): State<AppState>,
    ctx: AuthContext,
    body: Option<Json<ConfirmAppliedRequest>>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let application = state
        .workspaces
        .read(ctx.user_id, |ws| NewApplication::from_workspace(ws, request.url))
        .await?;
    let row = tracking::create(&state.db, ctx.user_id, application).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/applications
pub async fn handle_list(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    Ok(Json(tracking::list(&state.db, ctx.user_id).await?))
}

/// GET /api/v1/applications/board
pub async fn handle_board(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Board>, AppError> {
    let rows = tracking::list(&state.db, ctx.user_id).await?;
    Ok(Json(tracking::board(rows, Utc::now())))
}

/// PATCH /api/v1/applications/:id
pub async fn handle_update_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let row =
        tracking::set_status(&state.db, ctx.user_id, id, request.status, request.notes).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tracking::delete(&state.db, ctx.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
