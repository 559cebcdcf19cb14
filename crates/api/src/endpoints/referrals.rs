//! Referral endpoints.

use amora_common::AppResult;
use amora_core::referral::ReferralOutcome;
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Apply referral code request.
#[derive(Debug, Deserialize)]
pub struct ApplyReferralRequest {
    pub code: String,
}

async fn apply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ApplyReferralRequest>,
) -> AppResult<ApiResponse<ReferralOutcome>> {
    let outcome = state.referral_service.apply(&user.id, &req.code).await?;
    Ok(ApiResponse::ok(outcome))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/apply", post(apply))
}
