//! Client for the Python AI service: credit ledger, skill matching,
//! resume parsing and outreach generation.
//!
//! `AppState` holds an `Arc<dyn AiService>`; tests substitute in-memory fakes.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::generation::ContentKind;

#[cfg(test)]
pub mod fake;
pub mod models;

use models::{
    CreditBalance, CreditCheckRequest, CreditHistory, CreditHistoryRequest, DeductReceipt,
    DeductRequest, ErrorDetail, GenerateRequest, GenerateResponse, ParseResumeRequest,
    ParseResumeResponse, SkillMatchRequest, SkillMatchResponse,
};

#[derive(Debug, Error)]
pub enum AiServiceError {
    /// Transport failure or timeout: the service could not be reached.
    #[error("AI service unavailable: {0}")]
    Unavailable(String),

    /// HTTP 402 from a credit-gated endpoint.
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("AI service returned {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Malformed AI service response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AiService: Send + Sync {
    async fn check_credits(&self, user_id: Uuid) -> Result<CreditBalance, AiServiceError>;

    async fn deduct_credits(&self, request: &DeductRequest)
        -> Result<DeductReceipt, AiServiceError>;

    async fn credit_history(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<CreditHistory, AiServiceError>;

    async fn skill_match(
        &self,
        request: &SkillMatchRequest,
    ) -> Result<SkillMatchResponse, AiServiceError>;

    async fn generate(
        &self,
        kind: ContentKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, AiServiceError>;

    async fn parse_resume(
        &self,
        request: &ParseResumeRequest,
    ) -> Result<ParseResumeResponse, AiServiceError>;
}

/// reqwest-backed implementation talking JSON to `AI_SERVICE_URL`.
#[derive(Clone)]
pub struct HttpAiService {
    client: Client,
    base_url: String,
}

impl HttpAiService {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, AiServiceError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AiServiceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            return Err(if status == StatusCode::PAYMENT_REQUIRED {
                AiServiceError::PaymentRequired(detail)
            } else {
                AiServiceError::Rejected {
                    status: status.as_u16(),
                    detail,
                }
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| AiServiceError::Decode(e.to_string()))
    }
}

/// Pulls FastAPI's `detail` out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(ErrorDetail {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorDetail { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no details provided".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl AiService for HttpAiService {
    async fn check_credits(&self, user_id: Uuid) -> Result<CreditBalance, AiServiceError> {
        self.post("/credits/check", &CreditCheckRequest { user_id })
            .await
    }

    async fn deduct_credits(
        &self,
        request: &DeductRequest,
    ) -> Result<DeductReceipt, AiServiceError> {
        self.post("/credits/deduct", request).await
    }

    async fn credit_history(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<CreditHistory, AiServiceError> {
        self.post("/credits/history", &CreditHistoryRequest { user_id, limit })
            .await
    }

    async fn skill_match(
        &self,
        request: &SkillMatchRequest,
    ) -> Result<SkillMatchResponse, AiServiceError> {
        self.post("/skill-match-analysis", request).await
    }

    async fn generate(
        &self,
        kind: ContentKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, AiServiceError> {
        self.post(kind.endpoint(), request).await
    }

    async fn parse_resume(
        &self,
        request: &ParseResumeRequest,
    ) -> Result<ParseResumeResponse, AiServiceError> {
        self.post("/parse-resume-comprehensive", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_reads_fastapi_string() {
        let body = r#"{"detail": "Insufficient credits. Need 1, have 0"}"#;
        assert_eq!(error_detail(body), "Insufficient credits. Need 1, have 0");
    }

    #[test]
    fn test_error_detail_serializes_structured_detail() {
        let body = r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#;
        assert!(error_detail(body).contains("field required"));
    }

    #[test]
    fn test_error_detail_falls_back_to_raw_body() {
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_detail(""), "no details provided");
    }

    #[test]
    fn test_parse_response_with_nullable_fields_decodes() {
        let body = r#"{
            "success": true,
            "data": {
                "personal": {"name": "Jane Doe", "email": null},
                "skills": ["Go", "Docker"],
                "experience": [{"job_title": "Dev", "company": "X", "duration": null}],
                "projects": null,
                "education": [{"degree": "BSc", "graduation_year": "2024"}],
                "parsing_confidence": null
            }
        }"#;
        let response: ParseResumeResponse = serde_json::from_str(body).unwrap();
        let data = response.data.unwrap();
        assert_eq!(data.skills, vec!["Go", "Docker"]);
        assert_eq!(data.experience[0].duration, "");
        assert!(data.projects.is_empty());
        assert_eq!(data.education[0].graduation_year, Some(2024));
    }

    #[test]
    fn test_parse_request_omits_flag_for_text() {
        let request = ParseResumeRequest {
            resume_id: Uuid::nil(),
            raw_text: "Jane Doe".to_string(),
            is_pdf_buffer: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("is_pdf_buffer").is_none());
    }

    #[test]
    fn test_skill_match_response_tolerates_missing_arrays() {
        let json = r#"{"match_percentage": 0, "match_level": "Poor Match"}"#;
        let response: SkillMatchResponse = serde_json::from_str(json).unwrap();
        assert!(response.matched_skills.is_empty());
        assert!(response.missing_skills.is_empty());
    }
}
