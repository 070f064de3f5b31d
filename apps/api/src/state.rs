use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::ai_service::AiService;
use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::extraction::fetch::PageFetcher;
use crate::handoff::HandoffStore;
use crate::llm_client::CompletionModel;
use crate::workflow::WorkspaceRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// Groq completion model used for job extraction.
    pub model: Arc<dyn CompletionModel>,
    /// Python AI service: credits, matching, parsing, generation.
    pub ai: Arc<dyn AiService>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub auth: Arc<dyn TokenVerifier>,
    /// Redis when configured, process memory otherwise.
    pub handoff: Arc<dyn HandoffStore>,
    pub workspaces: WorkspaceRegistry,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use aws_sdk_s3::config::{BehaviorVersion, Region};
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use crate::auth::{AuthError, AuthUser};
    use crate::extraction::fetch::FetchError;
    use crate::handoff::MemoryHandoffStore;
    use crate::llm_client::LlmError;

    pub const TEST_TOKEN: &str = "test-token";

    /// Accepts only `TEST_TOKEN`, as the given user.
    pub struct StaticVerifier(pub Uuid);

    #[async_trait]
    impl TokenVerifier for StaticVerifier {
        async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
            if token == TEST_TOKEN {
                Ok(AuthUser { id: self.0 })
            } else {
                Err(AuthError::InvalidToken)
            }
        }
    }

    struct OfflineModel;

    #[async_trait]
    impl CompletionModel for OfflineModel {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    struct OfflineFetcher;

    #[async_trait]
    impl PageFetcher for OfflineFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Err(FetchError::Transport("offline".to_string()))
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/hiremate_test".to_string(),
            redis_url: None,
            s3_bucket: "resumes".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            groq_api_key: "test".to_string(),
            ai_service_url: "http://localhost:8000".to_string(),
            handoff_ttl_secs: 300,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    /// State whose database pool never connects and whose outbound seams are
    /// offline. Only for requests that are rejected before reaching them.
    pub fn offline_state(user_id: Uuid, ai: Arc<dyn AiService>) -> AppState {
        let config = test_config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(&config.s3_endpoint)
            .build();

        AppState {
            db,
            s3: S3Client::from_conf(s3_config),
            config,
            model: Arc::new(OfflineModel),
            ai,
            fetcher: Arc::new(OfflineFetcher),
            auth: Arc::new(StaticVerifier(user_id)),
            handoff: Arc::new(MemoryHandoffStore::new()),
            workspaces: WorkspaceRegistry::new(),
        }
    }
}
