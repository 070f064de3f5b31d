//! One-shot handoff from the jobs page to a generator page.
//!
//! `prepare` stores the generation inputs under a fresh token with a short
//! TTL; `take` returns them once and deletes them in the same step.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{ContentKind, GenerationInput};
use crate::workflow::WorkspaceRegistry;

const KEY_PREFIX: &str = "hiremate:handoff:";

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("handoff store error: {0}")]
    Store(String),

    #[error("handoff payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<redis::RedisError> for HandoffError {
    fn from(e: redis::RedisError) -> Self {
        HandoffError::Store(e.to_string())
    }
}

impl From<HandoffError> for AppError {
    fn from(e: HandoffError) -> Self {
        AppError::Internal(anyhow::anyhow!(e))
    }
}

/// Key-value store with expiry and atomic read-and-delete.
#[async_trait]
pub trait HandoffStore: Send + Sync {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), HandoffError>;

    /// Returns the value at most once.
    async fn take(&self, key: &str) -> Result<Option<String>, HandoffError>;
}

/// Redis-backed store: `SET key value EX ttl` and `GETDEL key`.
#[derive(Clone)]
pub struct RedisHandoffStore {
    conn: ConnectionManager,
}

impl RedisHandoffStore {
    pub async fn connect(client: redis::Client) -> Result<Self, HandoffError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl HandoffStore for RedisHandoffStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), HandoffError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, HandoffError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GETDEL")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }
}

/// Process-local store for single-instance runs and tests.
#[derive(Default)]
pub struct MemoryHandoffStore {
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl MemoryHandoffStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HandoffStore for MemoryHandoffStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), HandoffError> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| HandoffError::Store(e.to_string()))?;
        entries.retain(|_, (expires_at, _)| *expires_at > now);
        entries.insert(key.to_string(), (now + ttl, value));
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, HandoffError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| HandoffError::Store(e.to_string()))?;
        Ok(entries
            .remove(key)
            .filter(|(expires_at, _)| *expires_at > Instant::now())
            .map(|(_, value)| value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub user_id: Uuid,
    pub kind: ContentKind,
    #[serde(flatten)]
    pub input: GenerationInput,
}

/// What the jobs page needs to navigate to the generator page.
#[derive(Debug, Clone, Serialize)]
pub struct HandoffHandle {
    pub token: String,
    pub kind: ContentKind,
    pub destination: String,
    pub expires_in_secs: u64,
}

fn store_key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

/// Captures the current job, parsed resume and match for a generator page.
/// Fails with `MatchRequired` unless all three are current.
pub async fn prepare(
    store: &dyn HandoffStore,
    registry: &WorkspaceRegistry,
    user_id: Uuid,
    kind: ContentKind,
    ttl: Duration,
) -> Result<HandoffHandle, AppError> {
    let input = registry
        .read(user_id, |ws| ws.generation_input())
        .await?;

    let token = Uuid::new_v4().simple().to_string();
    let payload = HandoffPayload {
        user_id,
        kind,
        input,
    };
    let encoded = serde_json::to_string(&payload).map_err(HandoffError::from)?;
    store.put(&store_key(&token), encoded, ttl).await?;

    info!("Prepared {:?} handoff for user {user_id}", kind);
    Ok(HandoffHandle {
        destination: format!("/api/v1/content/{token}"),
        token,
        kind,
        expires_in_secs: ttl.as_secs(),
    })
}

/// Consumes a handoff. Expired, already used or foreign tokens are `NotFound`.
pub async fn take(
    store: &dyn HandoffStore,
    user_id: Uuid,
    token: &str,
) -> Result<HandoffPayload, AppError> {
    let not_found = || AppError::NotFound("This link has expired or was already used".to_string());

    let raw = store.take(&store_key(token)).await?.ok_or_else(not_found)?;
    let payload: HandoffPayload = serde_json::from_str(&raw).map_err(HandoffError::from)?;
    if payload.user_id != user_id {
        debug!("Handoff token presented by a different user");
        return Err(not_found());
    }
    Ok(payload)
}
