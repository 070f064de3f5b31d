//! Outreach content generation.
//!
//! Generation itself is remote; this module owns the four content kinds,
//! the draft a generated text becomes, and the error mapping at the boundary.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai_service::models::GenerateRequest;
use crate::ai_service::{AiService, AiServiceError};
use crate::auth::AuthContext;
use crate::credits::ActionType;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    CoverLetter,
    ColdEmail,
    LinkedinDm,
    LinkedinConnection,
}

impl ContentKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ContentKind::CoverLetter => "/generate-cover-letter",
            ContentKind::ColdEmail => "/generate-cold-email",
            ContentKind::LinkedinDm => "/generate-linkedin-dm",
            ContentKind::LinkedinConnection => "/generate-linkedin-connection-note",
        }
    }

    /// Ledger action the remote endpoint charges for.
    pub fn action_type(&self) -> ActionType {
        match self {
            ContentKind::CoverLetter => ActionType::CoverLetter,
            ContentKind::ColdEmail => ActionType::ColdEmail,
            ContentKind::LinkedinDm => ActionType::LinkedinDm,
            ContentKind::LinkedinConnection => ActionType::LinkedinConnection,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContentKind::CoverLetter => "Cover letter",
            ContentKind::ColdEmail => "Cold email",
            ContentKind::LinkedinDm => "LinkedIn message",
            ContentKind::LinkedinConnection => "LinkedIn connection note",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ContentKind::CoverLetter => "cover-letter.txt",
            ContentKind::ColdEmail => "cold-email.txt",
            ContentKind::LinkedinDm => "linkedin-dm.txt",
            ContentKind::LinkedinConnection => "linkedin-connection-note.txt",
        }
    }
}

/// Everything a generator needs, captured when the user leaves the jobs page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationInput {
    pub job_data: Value,
    pub resume_data: Value,
    pub skill_match_data: Value,
}

/// Generated text the user can edit, regenerate and export.
#[derive(Debug, Clone, Serialize)]
pub struct ContentDraft {
    pub id: Uuid,
    pub kind: ContentKind,
    pub content: String,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub input: GenerationInput,
}

impl ContentDraft {
    pub fn new(kind: ContentKind, content: String, input: GenerationInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            content,
            edited: false,
            created_at: now,
            updated_at: now,
            input,
        }
    }

    pub fn edit(&mut self, content: String) {
        self.content = content;
        self.edited = true;
        self.updated_at = Utc::now();
    }

    /// Replaces the text with a fresh generation, discarding manual edits.
    pub fn replace(&mut self, content: String) {
        self.content = content;
        self.edited = false;
        self.updated_at = Utc::now();
    }
}

/// Calls the remote generator for `kind`.
///
/// The service's own error text is surfaced verbatim so the caller can show
/// it next to a retry action.
pub async fn generate(
    ai: &dyn AiService,
    ctx: &AuthContext,
    kind: ContentKind,
    input: &GenerationInput,
) -> Result<String, AppError> {
    let request = GenerateRequest {
        user_id: ctx.user_id,
        job_data: input.job_data.clone(),
        resume_data: input.resume_data.clone(),
        skill_match_data: input.skill_match_data.clone(),
    };

    info!("Generating {:?} for user {}", kind, ctx.user_id);

    match ai.generate(kind, &request).await {
        Ok(response) if response.success => match response.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(AppError::GenerationFailed(format!(
                "{} generation returned no content",
                kind.display_name()
            ))),
        },
        Ok(response) => {
            let error = response
                .error
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!("{:?} generation failed for user {}: {error}", kind, ctx.user_id);
            Err(AppError::GenerationFailed(error))
        }
        Err(AiServiceError::PaymentRequired(detail)) => Err(AppError::InsufficientCredits(detail)),
        Err(AiServiceError::Rejected { detail, .. }) => Err(AppError::GenerationFailed(detail)),
        Err(e @ (AiServiceError::Unavailable(_) | AiServiceError::Decode(_))) => {
            Err(AppError::RemoteService(e.to_string()))
        }
    }
}
