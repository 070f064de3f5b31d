//! Credit gate over the remote ledger.
//!
//! Ledger rejections are final. An unreachable ledger is not: the action
//! proceeds unmetered and the decision is logged.

pub mod handlers;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::ai_service::models::{DeductReceipt, DeductRequest};
use crate::ai_service::{AiService, AiServiceError};
use crate::auth::AuthContext;
use crate::errors::AppError;

/// Metered actions known to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    JobSearch,
    CoverLetter,
    ColdEmail,
    LinkedinDm,
    LinkedinConnection,
    ResumeAnalysis,
    SkillAnalysis,
    BulkApplication,
    PremiumFeature,
}

impl ActionType {
    pub fn cost(&self) -> i64 {
        match self {
            ActionType::JobSearch
            | ActionType::CoverLetter
            | ActionType::ColdEmail
            | ActionType::LinkedinDm
            | ActionType::LinkedinConnection
            | ActionType::SkillAnalysis => 1,
            ActionType::ResumeAnalysis => 2,
            ActionType::PremiumFeature => 3,
            ActionType::BulkApplication => 5,
        }
    }

    /// Cost of an action by its ledger name. Unknown actions cost 1.
    pub fn cost_of(name: &str) -> i64 {
        serde_json::from_value::<ActionType>(Value::String(name.to_string()))
            .map(|a| a.cost())
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone)]
pub enum ChargeOutcome {
    Charged(DeductReceipt),
    /// The ledger could not be reached; the action runs without a deduction.
    Unmetered { reason: String },
}

/// Pre-check result. `after` is what the balance would be post-deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditQuote {
    pub has_credits: bool,
    pub current: i64,
    pub required: i64,
    pub after: i64,
}

/// Deducts `action` from the caller's balance.
pub async fn charge(
    ai: &dyn AiService,
    ctx: &AuthContext,
    action: ActionType,
    metadata: Value,
) -> Result<ChargeOutcome, AppError> {
    let request = DeductRequest {
        user_id: ctx.user_id,
        action_type: action,
        metadata,
    };

    match ai.deduct_credits(&request).await {
        Ok(receipt) => {
            info!(
                "Deducted {} credit(s) for {:?} from user {} ({} -> {})",
                receipt.credits_used,
                action,
                ctx.user_id,
                receipt.credits_before,
                receipt.credits_after
            );
            Ok(ChargeOutcome::Charged(receipt))
        }
        Err(AiServiceError::Unavailable(reason)) => {
            warn!(
                "Credit ledger unreachable, proceeding unmetered with {:?} for user {}: {reason}",
                action, ctx.user_id
            );
            Ok(ChargeOutcome::Unmetered { reason })
        }
        Err(AiServiceError::PaymentRequired(detail))
        | Err(AiServiceError::Rejected { detail, .. }) => {
            info!("Credit deduction refused for user {}: {detail}", ctx.user_id);
            Err(AppError::InsufficientCredits(detail))
        }
        Err(AiServiceError::Decode(msg)) => {
            // The ledger accepted the deduction but replied with something unexpected.
            warn!("Unreadable deduction receipt for user {}: {msg}", ctx.user_id);
            Ok(ChargeOutcome::Unmetered { reason: msg })
        }
    }
}

/// Reports whether the caller can afford `action` without deducting anything.
pub async fn quote(ai: &dyn AiService, ctx: &AuthContext, action: ActionType) -> CreditQuote {
    let required = action.cost();
    match ai.check_credits(ctx.user_id).await {
        Ok(balance) if balance.success => CreditQuote {
            has_credits: balance.credits >= required,
            current: balance.credits,
            required,
            after: balance.credits - required,
        },
        Ok(balance) => {
            warn!(
                "Credit check unsuccessful for user {}: {:?}",
                ctx.user_id, balance.error_message
            );
            unmetered_quote(required)
        }
        Err(e) => {
            warn!("Credit check failed for user {}, allowing: {e}", ctx.user_id);
            unmetered_quote(required)
        }
    }
}

fn unmetered_quote(required: i64) -> CreditQuote {
    CreditQuote {
        has_credits: true,
        current: 0,
        required,
        after: 0,
    }
}
