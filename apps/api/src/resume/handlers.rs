//! Axum route handlers for the Resume API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::resume::ParseStatus;
use crate::resume::{self, validate_upload, ParseJob, SignedUrl, MAX_UPLOAD_MB, SIGNED_URL_TTL};
use crate::state::AppState;
use crate::workflow::{self, ResumeSlot};

/// Bodies cut off by the route's length limit are oversized uploads.
fn multipart_error(e: MultipartError, context: &str) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge {
            limit_mb: MAX_UPLOAD_MB,
        }
    } else {
        AppError::Validation(format!("{context}: {e}"))
    }
}

fn parse_job(state: &AppState) -> ParseJob {
    ParseJob {
        db: state.db.clone(),
        ai: state.ai.clone(),
        registry: state.workspaces.clone(),
    }
}

/// POST /api/v1/resumes
///
/// Accepts a multipart form with a single `file` part (PDF, at most 10 MB).
/// Returns the new resume in `pending` state; parsing continues in the background.
pub async fn handle_upload(
    State(state): State<AppState>,
    ctx: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeSlot>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to read multipart data"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("resume.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file bytes"))?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let (filename, content_type, bytes) = upload
        .ok_or_else(|| AppError::Validation("Multipart form must include a file".to_string()))?;
    validate_upload(content_type.as_deref(), &bytes)?;

    let row = resume::upload(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        ctx.user_id,
        &filename,
        bytes.clone(),
    )
    .await?;

    let slot = ResumeSlot::from(&row);
    state
        .workspaces
        .update(ctx.user_id, |ws| ws.set_resume(slot.clone()))
        .await;

    info!("Resume {} uploaded by user {}, parsing", row.id, ctx.user_id);
    parse_job(&state).spawn(ctx.user_id, row.id, bytes.to_vec());

    Ok((StatusCode::CREATED, Json(slot)))
}

/// GET /api/v1/resumes/current
pub async fn handle_get_current(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<ResumeSlot>, AppError> {
    let row = resume::load_current(&state.db, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No resume uploaded yet".to_string()))?;
    Ok(Json(ResumeSlot::from(&row)))
}

/// GET /api/v1/resumes/:id/url
///
/// Signed link for viewing the PDF. Works whatever the parse status.
pub async fn handle_signed_url(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<SignedUrl>, AppError> {
    let row = resume::load(&state.db, ctx.user_id, resume_id).await?;
    let link = resume::signed_url(
        &state.s3,
        &state.config.s3_bucket,
        &row.file_path,
        SIGNED_URL_TTL,
    )
    .await?;
    Ok(Json(link))
}

/// POST /api/v1/resumes/:id/parse
///
/// Re-runs parsing for a stored resume, typically after a failure.
pub async fn handle_retry_parse(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(resume_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ResumeSlot>), AppError> {
    let row = resume::load(&state.db, ctx.user_id, resume_id).await?;
    let pdf = resume::fetch_pdf(&state.s3, &state.config.s3_bucket, &row.file_path).await?;

    workflow::hydrate(&state.db, &state.workspaces, ctx.user_id).await?;
    state
        .workspaces
        .update(ctx.user_id, |ws| ws.mark_parsing(row.id))
        .await;

    info!("Retrying parse of resume {resume_id} for user {}", ctx.user_id);
    parse_job(&state).spawn(ctx.user_id, row.id, pdf);

    let mut slot = ResumeSlot::from(&row);
    slot.status = ParseStatus::Parsing;
    slot.parse_error = None;
    Ok((StatusCode::ACCEPTED, Json(slot)))
}
