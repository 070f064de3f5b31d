//! Skill-match orchestration against the remote matcher.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::ai_service::models::{MatchedSkill, SkillMatchRequest, SkillMatchResponse};
use crate::ai_service::{AiService, AiServiceError};
use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::workflow::{MatchKey, WorkspaceRegistry};

/// Inputs captured under the workspace lock before the remote call.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub key: MatchKey,
    pub job_skills: Vec<String>,
    pub resume_skills: Vec<String>,
}

/// Local display band. The remote `match_level` stays the authoritative label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl MatchTier {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            MatchTier::Excellent
        } else if percentage >= 70.0 {
            MatchTier::Good
        } else if percentage >= 60.0 {
            MatchTier::Fair
        } else {
            MatchTier::Poor
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total_job_skills: usize,
    pub total_resume_skills: usize,
    pub matched_count: usize,
    pub missing_count: usize,
    pub bonus_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_percentage: f64,
    pub match_level: String,
    pub tier: MatchTier,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<String>,
    pub bonus_skills: Vec<String>,
    pub summary: MatchSummary,
}

impl MatchResult {
    /// Builds the local result. Summary counts come from the arrays and the
    /// request inputs, never from whatever counts the service reports.
    pub fn from_response(response: SkillMatchResponse, snapshot: &MatchSnapshot) -> Self {
        let match_percentage = response.match_percentage.clamp(0.0, 100.0);
        let summary = MatchSummary {
            total_job_skills: snapshot.job_skills.len(),
            total_resume_skills: snapshot.resume_skills.len(),
            matched_count: response.matched_skills.len(),
            missing_count: response.missing_skills.len(),
            bonus_count: response.bonus_skills.len(),
        };

        Self {
            match_percentage,
            match_level: response.match_level,
            tier: MatchTier::from_percentage(match_percentage),
            matched_skills: response.matched_skills,
            missing_skills: response.missing_skills,
            bonus_skills: response.bonus_skills,
            summary,
        }
    }

    /// The `skill_match_data` object handed to the content generators.
    pub fn to_skill_match_data(&self) -> Value {
        json!({
            "match_percentage": self.match_percentage,
            "match_level": self.match_level,
            "matched_skills": self.matched_skills,
            "missing_skills": self.missing_skills,
            "bonus_skills": self.bonus_skills,
            "summary": self.summary,
        })
    }
}

/// Computes and stores the match for the caller's current resume and job.
///
/// Preconditions are checked before anything is sent. The lock is released
/// for the remote call; if the inputs changed meanwhile the result is
/// discarded with `Conflict`.
pub async fn compute_match(
    ai: &dyn AiService,
    registry: &WorkspaceRegistry,
    ctx: &AuthContext,
) -> Result<MatchResult, AppError> {
    let snapshot = registry
        .read(ctx.user_id, |ws| ws.match_snapshot())
        .await?;

    let request = SkillMatchRequest {
        user_id: ctx.user_id,
        job_skills: snapshot.job_skills.clone(),
        resume_skills: snapshot.resume_skills.clone(),
    };

    let response = ai.skill_match(&request).await.map_err(|e| match e {
        AiServiceError::PaymentRequired(detail) => AppError::InsufficientCredits(detail),
        other => AppError::RemoteService(other.to_string()),
    })?;

    let result = MatchResult::from_response(response, &snapshot);
    registry
        .update(ctx.user_id, |ws| ws.store_match(snapshot.key, result.clone()))
        .await?;

    info!(
        "Match for user {}: {:.1}% ({}), {}/{} job skills matched",
        ctx.user_id,
        result.match_percentage,
        result.match_level,
        result.summary.matched_count,
        result.summary.total_job_skills
    );

    Ok(result)
}
