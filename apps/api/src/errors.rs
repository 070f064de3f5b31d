use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),

    #[error("Only PDF files are accepted")]
    InvalidFileType,

    #[error("File exceeds the {limit_mb}MB limit")]
    FileTooLarge { limit_mb: usize },

    #[error("Resume has not been parsed yet")]
    ResumeNotParsed,

    #[error("Resume parsing failed: {0}")]
    ParsingFailed(String),

    #[error("A skill match must be computed first")]
    MatchRequired,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AppError::InsufficientCredits(_) => "INSUFFICIENT_CREDITS",
            AppError::InvalidFileType => "INVALID_FILE_TYPE",
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::ResumeNotParsed => "RESUME_NOT_PARSED",
            AppError::ParsingFailed(_) => "PARSING_FAILED",
            AppError::MatchRequired => "MATCH_REQUIRED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::GenerationFailed(_) => "GENERATION_FAILED",
            AppError::RemoteService(_) => "REMOTE_SERVICE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::S3(_) => "S3_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::InsufficientCredits(msg) => (StatusCode::PAYMENT_REQUIRED, msg.clone()),
            AppError::InvalidFileType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Please upload a PDF file only".to_string(),
            ),
            AppError::FileTooLarge { limit_mb } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File size must be less than {limit_mb}MB"),
            ),
            AppError::ResumeNotParsed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Your resume has not been parsed yet. Wait for parsing to finish or retry it."
                    .to_string(),
            ),
            AppError::ParsingFailed(msg) => {
                tracing::warn!("Resume parsing failed: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Resume parsing failed. Please retry or upload again.".to_string(),
                )
            }
            AppError::MatchRequired => (
                StatusCode::CONFLICT,
                "Please ensure job analysis and resume matching are complete".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            // Surfaced verbatim so the destination page can show it next to a retry button.
            AppError::GenerationFailed(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::RemoteService(msg) => {
                tracing::error!("Remote service error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "A remote service is unavailable. Please try again.".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
