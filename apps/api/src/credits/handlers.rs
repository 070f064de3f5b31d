use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ai_service::models::CreditTransaction;
use crate::auth::AuthContext;
use crate::credits::{quote, ActionType, CreditQuote};
use crate::errors::AppError;
use crate::state::AppState;

const HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub credits: i64,
    pub transactions: Vec<CreditTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub action: ActionType,
}

/// GET /api/v1/credits
///
/// Current balance and the most recent ledger transactions, newest first.
pub async fn handle_get_credits(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<CreditsResponse>, AppError> {
    let balance = state
        .ai
        .check_credits(ctx.user_id)
        .await
        .map_err(|e| AppError::RemoteService(e.to_string()))?;
    let history = state
        .ai
        .credit_history(ctx.user_id, HISTORY_LIMIT)
        .await
        .map_err(|e| AppError::RemoteService(e.to_string()))?;

    let mut transactions = history.transactions;
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(CreditsResponse {
        credits: balance.credits,
        transactions,
    }))
}

/// GET /api/v1/credits/quote?action=cover_letter
pub async fn handle_quote(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<QuoteParams>,
) -> Result<Json<CreditQuote>, AppError> {
    Ok(Json(quote(state.ai.as_ref(), &ctx, params.action).await))
}
