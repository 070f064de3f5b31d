//! Resume upload, storage and parsing.
//!
//! Upload stores the PDF and inserts a `pending` row, then the parse runs as a
//! background task. Only a completed parse makes a resume usable for matching.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ai_service::models::{ParseResumeRequest, RemoteParsedResume};
use crate::ai_service::AiService;
use crate::errors::AppError;
use crate::models::resume::{ParseStatus, ParsedResume, ResumeRow};
use crate::workflow::WorkspaceRegistry;

pub const MAX_UPLOAD_MB: usize = 10;
pub const MAX_UPLOAD_BYTES: usize = MAX_UPLOAD_MB * 1024 * 1024;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_SIGNATURE: &[u8] = b"%PDF";
const DEFAULT_PARSING_CONFIDENCE: f64 = 0.9;

/// Lifetime of a resume viewing link.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Checks declared type, file signature and size, in that order.
pub fn validate_upload(content_type: Option<&str>, bytes: &[u8]) -> Result<(), AppError> {
    let declared_pdf = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim())
        .is_some_and(|ct| ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE));
    if !declared_pdf || !bytes.starts_with(PDF_SIGNATURE) {
        return Err(AppError::InvalidFileType);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::FileTooLarge {
            limit_mb: MAX_UPLOAD_MB,
        });
    }
    Ok(())
}

pub fn storage_key(user_id: Uuid, unix_millis: i64) -> String {
    format!("resumes/{user_id}/{user_id}-{unix_millis}.pdf")
}

/// The user's most recently uploaded resume.
pub async fn load_current(db: &PgPool, user_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?)
}

pub async fn load(db: &PgPool, user_id: Uuid, resume_id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

/// Stores a validated PDF and records it as the user's newest resume.
/// Earlier uploads are kept.
pub async fn upload(
    db: &PgPool,
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    user_id: Uuid,
    filename: &str,
    bytes: Bytes,
) -> Result<ResumeRow, AppError> {
    let key = storage_key(user_id, Utc::now().timestamp_millis());

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type(PDF_CONTENT_TYPE)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Resume upload failed: {e}")))?;

    info!("Uploaded resume to s3://{bucket}/{key}");

    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (id, user_id, filename, file_path, parse_status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(filename)
    .bind(&key)
    .bind(ParseStatus::Pending.as_str())
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn fetch_pdf(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
) -> Result<Vec<u8>, AppError> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Resume download failed: {e}")))?;
    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::S3(format!("Resume download failed: {e}")))?;
    Ok(data.into_bytes().to_vec())
}

/// Time-limited link for viewing a stored resume.
#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_in_secs: u64,
}

pub async fn signed_url(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    ttl: Duration,
) -> Result<SignedUrl, AppError> {
    let presigning = PresigningConfig::expires_in(ttl)
        .map_err(|e| AppError::S3(format!("Invalid link lifetime: {e}")))?;
    let request = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(presigning)
        .await
        .map_err(|e| AppError::S3(format!("Resume link signing failed: {e}")))?;

    Ok(SignedUrl {
        url: request.uri().to_string(),
        expires_in_secs: ttl.as_secs(),
    })
}

async fn set_status(
    db: &PgPool,
    resume_id: Uuid,
    status: ParseStatus,
    parse_error: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE resumes SET parse_status = $1, parse_error = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(parse_error)
        .bind(resume_id)
        .execute(db)
        .await?;
    Ok(())
}

async fn store_parsed(db: &PgPool, resume_id: Uuid, parsed: &ParsedResume) -> Result<(), AppError> {
    let data = serde_json::to_value(parsed).map_err(|e| AppError::Internal(e.into()))?;
    sqlx::query(
        "UPDATE resumes SET parse_status = $1, parse_error = NULL, parsed_data = $2 WHERE id = $3",
    )
    .bind(ParseStatus::Parsed.as_str())
    .bind(data)
    .bind(resume_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Extracts text locally; falls back to shipping the whole PDF when that
/// yields nothing.
pub async fn build_parse_request(resume_id: Uuid, pdf: Vec<u8>) -> ParseResumeRequest {
    let bytes = pdf.clone();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .ok()
        .and_then(Result::ok)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        warn!("No text extracted from resume {resume_id}, sending PDF buffer");
        ParseResumeRequest {
            resume_id,
            raw_text: BASE64.encode(&pdf),
            is_pdf_buffer: true,
        }
    } else {
        ParseResumeRequest {
            resume_id,
            raw_text: text,
            is_pdf_buffer: false,
        }
    }
}

/// Maps the parser's payload to a `ParsedResume`. A payload carrying an
/// `error` is the parser's empty fallback and counts as a failure.
pub fn into_parsed(data: RemoteParsedResume) -> Result<ParsedResume, String> {
    if let Some(error) = data.error {
        return Err(error);
    }
    let personal = data.personal;
    Ok(ParsedResume {
        name: personal.name.unwrap_or_else(|| "Unknown".to_string()),
        email: personal.email.unwrap_or_default(),
        phone: personal.phone.unwrap_or_default(),
        location: personal.location.unwrap_or_default(),
        skills: data.skills,
        experience: data.experience,
        projects: data.projects,
        education: data.education,
        parsing_confidence: data
            .parsing_confidence
            .unwrap_or(DEFAULT_PARSING_CONFIDENCE)
            .clamp(0.0, 1.0),
    })
}

/// Sends the PDF to the remote parser.
pub async fn parse_pdf(
    ai: &dyn AiService,
    resume_id: Uuid,
    pdf: Vec<u8>,
) -> Result<ParsedResume, AppError> {
    let request = build_parse_request(resume_id, pdf).await;
    let response = ai
        .parse_resume(&request)
        .await
        .map_err(|e| AppError::ParsingFailed(e.to_string()))?;

    if !response.success {
        return Err(AppError::ParsingFailed(
            response
                .error
                .unwrap_or_else(|| "Parser reported failure".to_string()),
        ));
    }
    let data = response
        .data
        .ok_or_else(|| AppError::ParsingFailed("Parser returned no data".to_string()))?;
    into_parsed(data).map_err(AppError::ParsingFailed)
}

/// Everything the background parse needs, detached from request state.
#[derive(Clone)]
pub struct ParseJob {
    pub db: PgPool,
    pub ai: Arc<dyn AiService>,
    pub registry: WorkspaceRegistry,
}

impl ParseJob {
    pub fn spawn(self, user_id: Uuid, resume_id: Uuid, pdf: Vec<u8>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(user_id, resume_id, pdf).await })
    }

    async fn run(self, user_id: Uuid, resume_id: Uuid, pdf: Vec<u8>) {
        if let Err(e) = set_status(&self.db, resume_id, ParseStatus::Parsing, None).await {
            error!("Could not mark resume {resume_id} as parsing: {e}");
        }
        self.registry
            .update(user_id, |ws| ws.mark_parsing(resume_id))
            .await;

        match parse_pdf(self.ai.as_ref(), resume_id, pdf).await {
            Ok(parsed) => {
                info!(
                    "Parsed resume {resume_id}: {} skills, confidence {:.2}",
                    parsed.skills.len(),
                    parsed.parsing_confidence
                );
                if let Err(e) = store_parsed(&self.db, resume_id, &parsed).await {
                    error!("Could not store parse result for resume {resume_id}: {e}");
                }
                self.registry
                    .update(user_id, |ws| ws.record_parse(resume_id, Ok(parsed)))
                    .await;
            }
            Err(e) => {
                let message = match e {
                    AppError::ParsingFailed(msg) => msg,
                    other => other.to_string(),
                };
                warn!("Parsing failed for resume {resume_id}: {message}");
                if let Err(e) =
                    set_status(&self.db, resume_id, ParseStatus::Failed, Some(&message)).await
                {
                    error!("Could not mark resume {resume_id} as failed: {e}");
                }
                self.registry
                    .update(user_id, |ws| ws.record_parse(resume_id, Err(message)))
                    .await;
            }
        }
    }
}
