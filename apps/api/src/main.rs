mod ai_service;
mod auth;
mod config;
mod credits;
mod db;
mod errors;
mod extraction;
mod generation;
mod handoff;
mod llm_client;
mod models;
mod resume;
mod routes;
mod state;
mod tracking;
mod workflow;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_service::HttpAiService;
use crate::auth::SupabaseVerifier;
use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::fetch::HttpPageFetcher;
use crate::handoff::{HandoffStore, MemoryHandoffStore, RedisHandoffStore};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::workflow::WorkspaceRegistry;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HireMate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // One HTTP client shared by every outbound integration
    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

    let model = LlmClient::new(http.clone(), config.groq_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let ai = HttpAiService::new(http.clone(), config.ai_service_url.clone());
    info!("AI service client initialized ({})", config.ai_service_url);

    let auth = SupabaseVerifier::new(
        http.clone(),
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
    );

    let handoff = build_handoff_store(&config).await?;

    // Build app state
    let state = AppState {
        db,
        s3,
        config: config.clone(),
        model: Arc::new(model),
        ai: Arc::new(ai),
        fetcher: Arc::new(HttpPageFetcher::new(http)),
        auth: Arc::new(auth),
        handoff,
        workspaces: WorkspaceRegistry::new(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis when `REDIS_URL` is set, otherwise an in-process store.
async fn build_handoff_store(config: &Config) -> Result<Arc<dyn HandoffStore>> {
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let store = RedisHandoffStore::connect(client).await?;
            info!("Redis handoff store initialized");
            Ok(Arc::new(store))
        }
        None => {
            warn!("REDIS_URL not set; handoffs are kept in process memory");
            Ok(Arc::new(MemoryHandoffStore::new()))
        }
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "hiremate-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
