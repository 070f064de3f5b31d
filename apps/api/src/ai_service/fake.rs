//! In-memory `AiService` used by unit tests across the crate.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{
    CreditBalance, CreditHistory, CreditTransaction, DeductReceipt, DeductRequest,
    GenerateRequest, GenerateResponse, MatchedSkill, ParseResumeRequest, ParseResumeResponse,
    RemoteParsedResume, RemotePersonal, SkillMatchRequest, SkillMatchResponse,
};
use super::{AiService, AiServiceError};
use crate::credits::ActionType;
use crate::generation::ContentKind;

type GenerateFn = fn(ContentKind, &GenerateRequest) -> Result<GenerateResponse, AiServiceError>;
type ParseFn = fn(&ParseResumeRequest) -> Result<ParseResumeResponse, AiServiceError>;

pub struct FakeAiService {
    pub credits: Mutex<i64>,
    /// Every ledger call fails as if the service were down.
    pub ledger_unreachable: bool,
    pub generate_fn: GenerateFn,
    pub parse_fn: ParseFn,
    /// Names of the remote operations invoked, in call order.
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeAiService {
    pub fn with_credits(credits: i64) -> Self {
        Self {
            credits: Mutex::new(credits),
            ledger_unreachable: false,
            generate_fn: default_generate,
            parse_fn: default_parse,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable_ledger() -> Self {
        Self {
            ledger_unreachable: true,
            ..Self::with_credits(0)
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn balance(&self) -> i64 {
        *self.credits.lock().unwrap()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    /// Mirrors the service-side credit decorator on gated endpoints.
    fn charge(&self, action: ActionType) -> Result<(), AiServiceError> {
        let mut credits = self.credits.lock().unwrap();
        let cost = action.cost();
        if *credits < cost {
            return Err(AiServiceError::PaymentRequired(format!(
                "Insufficient credits. Need {cost}, have {credits}"
            )));
        }
        *credits -= cost;
        Ok(())
    }
}

fn default_generate(
    kind: ContentKind,
    request: &GenerateRequest,
) -> Result<GenerateResponse, AiServiceError> {
    let role = request.job_data["role"].as_str().unwrap_or("the role");
    Ok(GenerateResponse {
        success: true,
        content: Some(format!("{} for {role}", kind.display_name())),
        error: None,
    })
}

fn default_parse(_: &ParseResumeRequest) -> Result<ParseResumeResponse, AiServiceError> {
    Ok(ParseResumeResponse {
        success: true,
        data: Some(RemoteParsedResume {
            personal: RemotePersonal {
                name: Some("Jane Doe".to_string()),
                email: Some("jane@example.com".to_string()),
                phone: None,
                location: Some("Berlin".to_string()),
            },
            skills: vec!["Go".to_string(), "Docker".to_string()],
            experience: vec![],
            projects: vec![],
            education: vec![],
            parsing_confidence: Some(0.92),
            error: None,
        }),
        error: None,
    })
}

/// Exact, case-insensitive scorer with equal weighting per job skill.
pub fn exact_match_score(request: &SkillMatchRequest) -> SkillMatchResponse {
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for job_skill in &request.job_skills {
        match request
            .resume_skills
            .iter()
            .find(|r| r.eq_ignore_ascii_case(job_skill))
        {
            Some(resume_skill) => matched.push(MatchedSkill {
                job_skill: job_skill.clone(),
                resume_skill: resume_skill.clone(),
                match_type: "exact".to_string(),
                confidence: 1.0,
                reasoning: "Exact skill match".to_string(),
            }),
            None => missing.push(job_skill.clone()),
        }
    }

    let bonus = request
        .resume_skills
        .iter()
        .filter(|r| !matched.iter().any(|m| &m.resume_skill == *r))
        .cloned()
        .collect();

    let match_percentage = if request.job_skills.is_empty() {
        0.0
    } else {
        (matched.len() as f64 / request.job_skills.len() as f64 * 1000.0).round() / 10.0
    };

    let match_level = if match_percentage >= 80.0 {
        "Excellent Match"
    } else if match_percentage >= 60.0 {
        "Good Match"
    } else if match_percentage >= 40.0 {
        "Fair Match"
    } else {
        "Poor Match"
    };

    SkillMatchResponse {
        match_percentage,
        match_level: match_level.to_string(),
        matched_skills: matched,
        missing_skills: missing,
        bonus_skills: bonus,
    }
}

#[async_trait]
impl AiService for FakeAiService {
    async fn check_credits(&self, _user_id: Uuid) -> Result<CreditBalance, AiServiceError> {
        self.record("check_credits");
        if self.ledger_unreachable {
            return Err(AiServiceError::Unavailable("connection refused".to_string()));
        }
        Ok(CreditBalance {
            success: true,
            credits: self.balance(),
            error_message: None,
        })
    }

    async fn deduct_credits(
        &self,
        request: &DeductRequest,
    ) -> Result<DeductReceipt, AiServiceError> {
        self.record("deduct_credits");
        if self.ledger_unreachable {
            return Err(AiServiceError::Unavailable("connection refused".to_string()));
        }
        let before = self.balance();
        self.charge(request.action_type)?;
        Ok(DeductReceipt {
            credits_before: before,
            credits_after: self.balance(),
            credits_used: request.action_type.cost(),
            transaction_id: None,
        })
    }

    async fn credit_history(
        &self,
        _user_id: Uuid,
        _limit: u32,
    ) -> Result<CreditHistory, AiServiceError> {
        self.record("credit_history");
        Ok(CreditHistory {
            success: true,
            transactions: vec![CreditTransaction {
                id: Some("t-1".to_string()),
                action_type: "job_search".to_string(),
                credits_used: 1,
                credits_before: 10,
                credits_after: 9,
                success: true,
                metadata: serde_json::json!({}),
                created_at: "2026-01-01T00:00:00".to_string(),
            }],
            error_message: None,
        })
    }

    async fn skill_match(
        &self,
        request: &SkillMatchRequest,
    ) -> Result<SkillMatchResponse, AiServiceError> {
        self.record("skill_match");
        self.charge(ActionType::SkillAnalysis)?;
        Ok(exact_match_score(request))
    }

    async fn generate(
        &self,
        kind: ContentKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, AiServiceError> {
        self.record("generate");
        self.charge(kind.action_type())?;
        (self.generate_fn)(kind, request)
    }

    async fn parse_resume(
        &self,
        request: &ParseResumeRequest,
    ) -> Result<ParseResumeResponse, AiServiceError> {
        self.record("parse_resume");
        (self.parse_fn)(request)
    }
}
