//! Coin balance, history and confirmed spending.

use amora_common::{AppError, AppResult};
use amora_core::{economy::SpendOutcome, spend_confirm::ConfirmationRequest};
use amora_db::entities::coin_transaction::{self, TransactionKind};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Balance response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: i64,
    pub is_premium: bool,
}

/// History request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    30
}

/// Ledger entry response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub amount: i64,
    pub kind: TransactionKind,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: String,
}

impl From<coin_transaction::Model> for TransactionResponse {
    fn from(t: coin_transaction::Model) -> Self {
        Self {
            id: t.id,
            amount: t.amount,
            kind: t.kind,
            reason: t.reason,
            metadata: t.metadata,
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

/// Spend request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpendRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 1, max = 64))]
    pub reason: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub metadata: Option<Value>,
}

/// Spend response. `accepted` is false when the user declined or never
/// answered, in which case nothing was charged.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SpendOutcome>,
}

/// Confirmation answer for the prompt with `id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub id: String,
    pub accept: bool,
}

/// Whether an answer reached an outstanding request. False when the prompt
/// was answered, withdrawn or replaced in the meantime.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub delivered: bool,
}

async fn balance(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<BalanceResponse>> {
    let balance = state.economy_service.balance(&user.id).await?;
    Ok(ApiResponse::ok(BalanceResponse {
        balance,
        is_premium: user.is_premium,
    }))
}

async fn history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> AppResult<ApiResponse<Vec<TransactionResponse>>> {
    let limit = req.limit.clamp(1, 100);
    let entries = state
        .economy_service
        .history(&user.id, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(entries.into_iter().map(Into::into).collect()))
}

/// Ask the user to confirm, then spend.
///
/// Holds the request open until the user answers through `/confirm`, or
/// until the confirmation timeout passes. Actions free for the caller's tier
/// are spent without asking.
async fn spend(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SpendRequest>,
) -> AppResult<ApiResponse<SpendResponse>> {
    req.validate()?;

    let free = state
        .economy_service
        .is_free_for(&user, &req.reason)
        .await?;

    // Fail before prompting when the spend cannot succeed anyway
    if !free && !user.is_premium && user.coin_balance < req.amount {
        return Err(AppError::InsufficientBalance {
            required: req.amount,
            available: user.coin_balance,
        });
    }

    // Free actions skip the prompt
    if !free {
        let gate = state.confirmations.gate_for(&user.id).await;
        let request = ConfirmationRequest::new(req.amount, &req.reason, req.description);
        let accepted = gate.confirm_within(request, state.confirm_timeout).await;
        drop(gate);
        state.confirmations.release(&user.id).await;

        if !accepted {
            tracing::debug!(user_id = %user.id, reason = %req.reason, "Spend declined");
            return Ok(ApiResponse::ok(SpendResponse {
                accepted: false,
                outcome: None,
            }));
        }
    }

    let outcome = state
        .economy_service
        .spend(&user.id, req.amount, &req.reason, req.metadata)
        .await?;
    Ok(ApiResponse::ok(SpendResponse {
        accepted: true,
        outcome: Some(outcome),
    }))
}

/// The prompt currently waiting for the caller's answer.
async fn confirmation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Option<ConfirmationRequest>>> {
    let pending = match state.confirmations.existing(&user.id).await {
        Some(gate) => gate.pending().await,
        None => None,
    };
    Ok(ApiResponse::ok(pending))
}

async fn confirm(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<ApiResponse<ConfirmResponse>> {
    let gate = state
        .confirmations
        .existing(&user.id)
        .await
        .ok_or_else(|| AppError::NotFound("No pending confirmation".to_string()))?;

    let delivered = gate.respond(&req.id, req.accept).await;
    drop(gate);
    state.confirmations.release(&user.id).await;

    Ok(ApiResponse::ok(ConfirmResponse { delivered }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(balance))
        .route("/history", post(history))
        .route("/spend", post(spend))
        .route("/confirmation", post(confirmation))
        .route("/confirm", post(confirm))
}
