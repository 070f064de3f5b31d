//! Request authentication.
//!
//! Every workflow handler receives an explicit `AuthContext` (verified user
//! and an optional credit snapshot) instead of reading ambient global auth
//! state.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ai_service::AiService;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// A user as confirmed by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Verifies access tokens against Supabase Auth (`GET /auth/v1/user`).
pub struct SupabaseVerifier {
    client: Client,
    supabase_url: String,
    anon_key: String,
}

impl SupabaseVerifier {
    pub fn new(client: Client, supabase_url: String, anon_key: String) -> Self {
        Self {
            client,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key,
        }
    }
}

#[async_trait]
impl TokenVerifier for SupabaseVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.supabase_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::Unavailable(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(AuthError::InvalidToken);
        }

        response.json::<AuthUser>().await.map_err(|e| {
            warn!("Unexpected auth user payload: {e}");
            AuthError::InvalidToken
        })
    }
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    /// Last known credit balance; `None` until refreshed or if the ledger is down.
    pub credits: Option<i64>,
}

impl AuthContext {
    /// Refreshes the credit snapshot. Ledger failures leave it unknown.
    pub async fn refresh_credits(&mut self, ai: &dyn AiService) {
        self.credits = match ai.check_credits(self.user_id).await {
            Ok(balance) if balance.success => Some(balance.credits),
            Ok(balance) => {
                debug!(
                    "Credit check unsuccessful for user {}: {:?}",
                    self.user_id, balance.error_message
                );
                None
            }
            Err(e) => {
                warn!("Credit check failed for user {}: {e}", self.user_id);
                None
            }
        };
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers).ok_or(AppError::AuthenticationRequired)?;

        let user = state.auth.verify(token).await.map_err(|e| match e {
            AuthError::InvalidToken => AppError::AuthenticationRequired,
            AuthError::Unavailable(msg) => AppError::RemoteService(format!("auth: {msg}")),
        })?;

        Ok(AuthContext {
            user_id: user.id,
            credits: None,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_context(user_id: Uuid) -> AuthContext {
    AuthContext {
        user_id,
        credits: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_service::fake::FakeAiService;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_refresh_credits_records_balance() {
        let ai = FakeAiService::with_credits(7);
        let mut ctx = test_context(Uuid::new_v4());
        ctx.refresh_credits(&ai).await;
        assert_eq!(ctx.credits, Some(7));
    }

    #[tokio::test]
    async fn test_refresh_credits_unknown_when_ledger_down() {
        let ai = FakeAiService::unreachable_ledger();
        let mut ctx = test_context(Uuid::new_v4());
        ctx.credits = Some(3);
        ctx.refresh_credits(&ai).await;
        assert_eq!(ctx.credits, None);
    }
}
