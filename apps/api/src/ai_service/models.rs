//! Wire types for the Python AI service (FastAPI). Field names are the
//! service's own; do not rename.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::credits::ActionType;
use crate::models::resume::{
    null_as_default, string_list, EducationEntry, ExperienceEntry, ProjectEntry,
};

#[derive(Debug, Serialize)]
pub struct CreditCheckRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditBalance {
    pub success: bool,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeductRequest {
    pub user_id: Uuid,
    pub action_type: ActionType,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductReceipt {
    #[serde(default)]
    pub credits_before: i64,
    pub credits_after: i64,
    pub credits_used: i64,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreditHistoryRequest {
    pub user_id: Uuid,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    #[serde(default)]
    pub id: Option<String>,
    pub action_type: String,
    pub credits_used: i64,
    pub credits_before: i64,
    pub credits_after: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditHistory {
    pub success: bool,
    #[serde(default)]
    pub transactions: Vec<CreditTransaction>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillMatchRequest {
    pub user_id: Uuid,
    pub job_skills: Vec<String>,
    pub resume_skills: Vec<String>,
}

/// One job-side requirement satisfied by a resume-side skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub job_skill: String,
    pub resume_skill: String,
    /// "exact" | "ecosystem" | "partial" | model-assigned label
    pub match_type: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillMatchResponse {
    pub match_percentage: f64,
    pub match_level: String,
    #[serde(default)]
    pub matched_skills: Vec<MatchedSkill>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub bonus_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub user_id: Uuid,
    pub job_data: Value,
    pub resume_data: Value,
    pub skill_match_data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseResumeRequest {
    pub resume_id: Uuid,
    /// Extracted text, or the base64-encoded PDF when `is_pdf_buffer` is set.
    pub raw_text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_pdf_buffer: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemotePersonal {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteParsedResume {
    #[serde(default, deserialize_with = "null_as_default")]
    pub personal: RemotePersonal,
    #[serde(default, deserialize_with = "string_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub parsing_confidence: Option<f64>,
    /// Set by the parser when it fell back to an empty placeholder result.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseResumeResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<RemoteParsedResume>,
    #[serde(default)]
    pub error: Option<String>,
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: Value,
}
