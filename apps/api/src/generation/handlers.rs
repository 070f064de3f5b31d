//! Axum route handlers for the Content API.

use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::generation::{generate, ContentDraft, ContentKind};
use crate::handoff;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EditDraftRequest {
    pub content: String,
}

fn draft_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Draft {id} not found"))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/content/:token
///
/// Consumes a handoff and generates the content right away. The token is
/// spent even if generation fails; the user retries from the jobs page.
pub async fn handle_generate_from_handoff(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(token): Path<String>,
) -> Result<(StatusCode, Json<ContentDraft>), AppError> {
    let payload = handoff::take(state.handoff.as_ref(), ctx.user_id, &token).await?;

    let content = generate(state.ai.as_ref(), &ctx, payload.kind, &payload.input).await?;
    let draft = ContentDraft::new(payload.kind, content, payload.input);

    info!("Created {:?} draft {} for user {}", draft.kind, draft.id, ctx.user_id);
    let response = draft.clone();
    state
        .workspaces
        .update(ctx.user_id, |ws| ws.insert_draft(draft))
        .await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/content/drafts/:id
pub async fn handle_get_draft(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentDraft>, AppError> {
    state
        .workspaces
        .read(ctx.user_id, |ws| ws.draft(id).cloned())
        .await
        .map(Json)
        .ok_or_else(|| draft_not_found(id))
}

/// PUT /api/v1/content/drafts/:id
pub async fn handle_edit_draft(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<EditDraftRequest>,
) -> Result<Json<ContentDraft>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }

    state
        .workspaces
        .update(ctx.user_id, |ws| {
            ws.draft_mut(id).map(|draft| {
                draft.edit(request.content);
                draft.clone()
            })
        })
        .await
        .map(Json)
        .ok_or_else(|| draft_not_found(id))
}

/// DELETE /api/v1/content/drafts/:id
pub async fn handle_delete_draft(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let removed = state
        .workspaces
        .update(ctx.user_id, |ws| ws.remove_draft(id))
        .await;
    if !removed {
        return Err(draft_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/content/drafts/:id/regenerate
///
/// Generates a fresh text from the draft's original inputs. Charged again.
pub async fn handle_regenerate_draft(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentDraft>, AppError> {
    let (kind, input) = state
        .workspaces
        .read(ctx.user_id, |ws| ws.draft(id).map(|d| (d.kind, d.input.clone())))
        .await
        .ok_or_else(|| draft_not_found(id))?;

    let content = generate(state.ai.as_ref(), &ctx, kind, &input).await?;

    state
        .workspaces
        .update(ctx.user_id, |ws| {
            ws.draft_mut(id).map(|draft| {
                draft.replace(content);
                draft.clone()
            })
        })
        .await
        .map(Json)
        .ok_or_else(|| draft_not_found(id))
}

/// GET /api/v1/content/drafts/:id/download
pub async fn handle_download_draft(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (kind, content) = state
        .workspaces
        .read(ctx.user_id, |ws| ws.draft(id).map(|d| (d.kind, d.content.clone())))
        .await
        .ok_or_else(|| draft_not_found(id))?;

    Ok(download_response(kind, content))
}

fn download_response(kind: ContentKind, content: String) -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", kind.file_name()),
            ),
        ],
        content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_is_text_attachment() {
        let response =
            download_response(ContentKind::CoverLetter, "Dear team,".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"cover-letter.txt\""
        );
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Dear team,");
    }
}
