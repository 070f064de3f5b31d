use anyhow::{Context, Result};

const DEFAULT_AI_SERVICE_URL: &str = "http://localhost:8000";
const DEFAULT_HANDOFF_TTL_SECS: u64 = 300;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Optional. Without it the handoff channel falls back to process memory.
    pub redis_url: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub groq_api_key: String,
    pub ai_service_url: String,
    pub handoff_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            supabase_url: require_env("SUPABASE_URL")?,
            supabase_anon_key: require_env("SUPABASE_ANON_KEY")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            ai_service_url: std::env::var("AI_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_AI_SERVICE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            handoff_ttl_secs: std::env::var("HANDOFF_TTL_SECS")
                .map(|v| v.parse::<u64>())
                .unwrap_or(Ok(DEFAULT_HANDOFF_TTL_SECS))
                .context("HANDOFF_TTL_SECS must be a number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
