//! Job posting extraction from a URL or pasted text.
//!
//! Flow: charge `job_search` → fetch/normalize → Groq → parse first JSON
//! object → union explicit lexicon skills.
//!
//! Scraping and model failures are soft: the caller gets `NeedsManualInput`
//! and can paste the posting instead. Only auth and credit refusals are errors.

pub mod fetch;
pub mod handlers;
pub mod html;
pub mod prompts;
pub mod skills;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ai_service::AiService;
use crate::auth::AuthContext;
use crate::credits::{self, ActionType};
use crate::errors::AppError;
use crate::llm_client::{json_object_candidates, CompletionModel};
use crate::models::job::JobPosting;
use fetch::PageFetcher;
use prompts::JOB_EXTRACTION_PROMPT_TEMPLATE;

pub const SCRAPE_FAILED_MESSAGE: &str = "Unable to scrape this job posting. The site may be \
    protected or the URL is invalid. Please paste the job description manually.";
pub const PROCESS_FAILED_MESSAGE: &str = "Unable to process this job posting automatically. \
    Please paste the job description manually.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    Url(String),
    ManualText(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Extracted(JobPosting),
    NeedsManualInput { message: String },
}

impl Extraction {
    fn manual(message: &str) -> Self {
        Extraction::NeedsManualInput {
            message: message.to_string(),
        }
    }
}

/// Runs one extraction for the authenticated caller.
pub async fn extract(
    ai: &dyn AiService,
    fetcher: &dyn PageFetcher,
    model: &dyn CompletionModel,
    ctx: &AuthContext,
    source: JobSource,
) -> Result<Extraction, AppError> {
    let metadata = match &source {
        JobSource::Url(url) => json!({
            "endpoint": "extract-job",
            "url": url,
            "content_length": 0,
        }),
        JobSource::ManualText(text) => json!({
            "endpoint": "extract-job",
            "url": "manual_text",
            "content_length": text.chars().count(),
        }),
    };
    credits::charge(ai, ctx, ActionType::JobSearch, metadata).await?;

    let content = match source {
        JobSource::ManualText(text) => {
            let content = html::normalize(&text);
            if !html::is_substantial(&content) {
                info!("Manual job text too short ({} chars)", content.chars().count());
                return Ok(Extraction::manual(PROCESS_FAILED_MESSAGE));
            }
            content
        }
        JobSource::Url(url) => {
            let page = match fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Scraping {url} failed: {e}");
                    return Ok(Extraction::manual(SCRAPE_FAILED_MESSAGE));
                }
            };
            let content = html::normalize(&page);
            if !html::is_substantial(&content) {
                warn!("Insufficient content extracted from {url}");
                return Ok(Extraction::manual(SCRAPE_FAILED_MESSAGE));
            }
            info!("Scraped {} chars from {url}", content.len());
            content
        }
    };

    let prompt = JOB_EXTRACTION_PROMPT_TEMPLATE.replace("{content}", &content);
    let reply = match model.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Job extraction model call failed: {e}");
            return Ok(Extraction::manual(PROCESS_FAILED_MESSAGE));
        }
    };

    let Some(mut job) = parse_job_posting(&reply) else {
        warn!("Unusable job extraction reply: {}", preview(&reply));
        return Ok(Extraction::manual(PROCESS_FAILED_MESSAGE));
    };

    let explicit = skills::explicit_skills(&content);
    job.skills = skills::merge(std::mem::take(&mut job.skills), &explicit);

    info!(
        "Extracted job '{}' at {} with {} skills for user {}",
        job.role,
        job.company_or_unknown(),
        job.skills.len(),
        ctx.user_id
    );
    Ok(Extraction::Extracted(job))
}

/// Reads the first JSON object in a model reply that is a valid posting.
///
/// Requires a non-empty `role` and a `skills` array; other fields are kept
/// when they are text and stringified when they are plain numbers or booleans.
pub fn parse_job_posting(reply: &str) -> Option<JobPosting> {
    json_object_candidates(reply).find_map(|span| {
        let object: Value = serde_json::from_str(span).ok()?;
        posting_from_object(&object)
    })
}

fn posting_from_object(object: &Value) -> Option<JobPosting> {
    let role = object.get("role")?.as_str()?.trim().to_string();
    if role.is_empty() {
        return None;
    }
    let skills = object
        .get("skills")?
        .as_array()?
        .iter()
        .filter_map(|s| s.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let text = |key: &str| -> Option<String> {
        match object.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    };

    Some(JobPosting {
        role,
        company: text("company"),
        location: text("location"),
        description: text("description"),
        responsibilities: text("responsibilities"),
        qualifications: text("qualifications"),
        preferred_qualifications: text("preferredQualifications"),
        education: text("education"),
        experience: text("experience"),
        benefits: text("benefits"),
        salary: text("salary"),
        skills,
    })
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::fetch::FetchError;
    use super::*;
    use crate::ai_service::fake::FakeAiService;
    use crate::auth::test_context;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct StubFetcher {
        page: Option<String>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn serving(page: &str) -> Self {
            Self {
                page: Some(page.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn blocked() -> Self {
            Self {
                page: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.page.clone().ok_or(FetchError::Status(403))
        }
    }

    struct StubModel {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl StubModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionModel for StubModel {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(LlmError::EmptyContent)
        }
    }

    const MODEL_REPLY: &str = r#"Here is the analysis:
        {"role": "Full Stack Developer", "company": "Acme {Labs}", "location": null,
         "experience": 3, "skills": ["REST APIs", "Git"]}
        Let me know if you need anything else."#;

    fn long_posting() -> String {
        let mut text = String::from(
            "Acme Labs is hiring a Full Stack Developer. You will build customer-facing \
             features with React on the frontend and Python services on the backend. ",
        );
        while text.len() < 500 {
            text.push_str("You will collaborate with product and design on new features. ");
        }
        text
    }

    fn unwrap_job(extraction: Extraction) -> JobPosting {
        match extraction {
            Extraction::Extracted(job) => job,
            other => panic!("expected a job, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_short_manual_text_needs_manual_input() {
        let ai = FakeAiService::with_credits(5);
        let fetcher = StubFetcher::blocked();
        let model = StubModel::replying(MODEL_REPLY);
        let ctx = test_context(Uuid::new_v4());

        let text = "Senior engineer wanted. Apply today for this role!";
        assert_eq!(text.len(), 50);
        let result = extract(&ai, &fetcher, &model, &ctx, JobSource::ManualText(text.into()))
            .await
            .unwrap();

        assert_eq!(result, Extraction::manual(PROCESS_FAILED_MESSAGE));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_explicit_skills_are_added_to_model_skills() {
        let ai = FakeAiService::with_credits(5);
        let fetcher = StubFetcher::blocked();
        let model = StubModel::replying(MODEL_REPLY);
        let ctx = test_context(Uuid::new_v4());

        let job = unwrap_job(
            extract(&ai, &fetcher, &model, &ctx, JobSource::ManualText(long_posting()))
                .await
                .unwrap(),
        );

        assert_eq!(job.role, "Full Stack Developer");
        assert_eq!(job.company.as_deref(), Some("Acme {Labs}"));
        assert_eq!(job.experience.as_deref(), Some("3"));
        assert!(job.location.is_none());
        assert_eq!(job.skills, vec!["REST APIs", "Git", "Python", "React"]);
        assert_eq!(ai.balance(), 4);
    }

    #[tokio::test]
    async fn test_no_credits_blocks_before_fetch() {
        let ai = FakeAiService::with_credits(0);
        let fetcher = StubFetcher::serving(&long_posting());
        let model = StubModel::replying(MODEL_REPLY);
        let ctx = test_context(Uuid::new_v4());

        let err = extract(
            &ai,
            &fetcher,
            &model,
            &ctx,
            JobSource::Url("https://jobs.example.com/1".into()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InsufficientCredits(_)));
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_still_extracts() {
        let ai = FakeAiService::unreachable_ledger();
        let fetcher = StubFetcher::serving(&format!("<html><body>{}</body></html>", long_posting()));
        let model = StubModel::replying(MODEL_REPLY);
        let ctx = test_context(Uuid::new_v4());

        let job = unwrap_job(
            extract(
                &ai,
                &fetcher,
                &model,
                &ctx,
                JobSource::Url("https://jobs.example.com/1".into()),
            )
            .await
            .unwrap(),
        );
        assert_eq!(job.role, "Full Stack Developer");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_blocked_site_asks_for_manual_input() {
        let ai = FakeAiService::with_credits(5);
        let fetcher = StubFetcher::blocked();
        let model = StubModel::replying(MODEL_REPLY);
        let ctx = test_context(Uuid::new_v4());

        let result = extract(
            &ai,
            &fetcher,
            &model,
            &ctx,
            JobSource::Url("https://linkedin.example/jobs/1".into()),
        )
        .await
        .unwrap();
        assert_eq!(result, Extraction::manual(SCRAPE_FAILED_MESSAGE));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_script_heavy_page_is_too_thin() {
        let ai = FakeAiService::with_credits(5);
        let page = format!("<script>{}</script><p>Apply</p>", "x".repeat(5000));
        let fetcher = StubFetcher::serving(&page);
        let model = StubModel::replying(MODEL_REPLY);
        let ctx = test_context(Uuid::new_v4());

        let result = extract(&ai, &fetcher, &model, &ctx, JobSource::Url("https://a.b".into()))
            .await
            .unwrap();
        assert_eq!(result, Extraction::manual(SCRAPE_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_reply_without_json_needs_manual_input() {
        let ai = FakeAiService::with_credits(5);
        let fetcher = StubFetcher::blocked();
        let model = StubModel::replying("I could not find a job posting in that text.");
        let ctx = test_context(Uuid::new_v4());

        let result = extract(&ai, &fetcher, &model, &ctx, JobSource::ManualText(long_posting()))
            .await
            .unwrap();
        assert_eq!(result, Extraction::manual(PROCESS_FAILED_MESSAGE));
    }

    #[test]
    fn test_parse_rejects_missing_role_or_bad_skills() {
        assert!(parse_job_posting(r#"{"company": "Acme", "skills": []}"#).is_none());
        assert!(parse_job_posting(r#"{"role": "  ", "skills": []}"#).is_none());
        assert!(parse_job_posting(r#"{"role": "Dev", "skills": "Go, Rust"}"#).is_none());
        assert!(parse_job_posting(r#"{"role": "Dev", "skills": ["Go"}"#).is_none());
    }

    #[test]
    fn test_parse_skips_prose_braces_before_the_object() {
        let reply = r#"I extracted the fields {role, skills} as requested: {"role": "Data Engineer", "skills": ["Spark"]}"#;
        let job = parse_job_posting(reply).unwrap();
        assert_eq!(job.role, "Data Engineer");
        assert_eq!(job.skills, vec!["Spark"]);
    }

    #[test]
    fn test_parse_accepts_minimal_posting() {
        let job = parse_job_posting(r#"{"role": "Dev", "skills": ["Go", 7, ""]}"#).unwrap();
        assert_eq!(job.role, "Dev");
        assert_eq!(job.skills, vec!["Go"]);
        assert!(job.company.is_none());
    }
}
