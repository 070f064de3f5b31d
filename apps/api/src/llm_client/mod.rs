/// LLM client: the single point of entry for all Groq API calls in HireMate.
///
/// ARCHITECTURAL RULE: No other module may call the Groq API directly.
/// All LLM interactions MUST go through this module.
///
/// Model: llama3-70b-8192. Extraction prompts are tuned against it.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// The model used for all LLM calls in HireMate.
pub const MODEL: &str = "llama3-70b-8192";
const MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.2;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    /// Extracts the trimmed text of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct GroqError {
    error: GroqErrorBody,
}

#[derive(Debug, Deserialize)]
struct GroqErrorBody {
    message: String,
}

/// Plain-text completion seam. Extraction depends on this rather than on
/// `LlmClient` so it can be exercised without network access.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// The single LLM client used by all services in HireMate.
/// Wraps the Groq chat completions API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    /// Makes a raw call to the Groq API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: Option<&str>) -> Result<LlmResponse, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request_body = ChatRequest {
            model: MODEL,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(GROQ_API_URL)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GroqError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            if let Some(usage) = &llm_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, Some(prompts::JSON_ONLY_SYSTEM)).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Balanced `{ ... }` spans starting at each `{` in `text`, in order.
///
/// Models often wrap their JSON in prose or code fences. Braces inside JSON
/// string literals (including escaped quotes) do not affect nesting. Prose
/// such as `fields {role, skills}:` yields a span that is not JSON;
/// callers move on to the next candidate when a span fails to parse.
pub fn json_object_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('{')
        .filter_map(move |(start, _)| balanced_object(&text[start..]))
}

/// `text` starts with `{`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_json_object(text: &str) -> Option<&str> {
        json_object_candidates(text).next()
    }

    #[test]
    fn test_first_json_object_inside_code_fence() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(first_json_object(input), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_first_json_object_wrapped_in_prose() {
        let input = "Here is the job data you asked for:\n{\"role\": \"Engineer\"}\nLet me know!";
        assert_eq!(first_json_object(input), Some("{\"role\": \"Engineer\"}"));
    }

    #[test]
    fn test_first_json_object_keeps_nested_objects() {
        let input = r#"{"a": {"b": 1}, "c": 2} trailing {"d": 3}"#;
        assert_eq!(first_json_object(input), Some(r#"{"a": {"b": 1}, "c": 2}"#));
    }

    #[test]
    fn test_first_json_object_ignores_braces_in_strings() {
        let input = r#"{"role": "Dev {Rust}", "note": "say \"}\" loudly"}"#;
        assert_eq!(first_json_object(input), Some(input));
    }

    #[test]
    fn test_first_json_object_none_without_braces() {
        assert_eq!(first_json_object("no json here"), None);
    }

    #[test]
    fn test_first_json_object_none_when_unbalanced() {
        assert_eq!(first_json_object("{\"role\": \"Engineer\""), None);
    }

    #[test]
    fn test_candidates_skip_to_later_objects() {
        let input = r#"Returning fields {role, skills}: {"role": "Dev", "skills": []}"#;
        let candidates: Vec<_> = json_object_candidates(input).collect();
        assert_eq!(candidates[0], "{role, skills}");
        assert_eq!(candidates[1], r#"{"role": "Dev", "skills": []}"#);
    }

    #[test]
    fn test_llm_response_text_trims_first_choice() {
        let response: LlmResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "  {\"x\": 1}\n"}}], "usage": null}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("{\"x\": 1}"));
    }

    #[test]
    fn test_llm_response_text_none_when_blank() {
        let response: LlmResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "   "}}]}"#).unwrap();
        assert_eq!(response.text(), None);
    }
}
