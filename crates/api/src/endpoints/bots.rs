//! Bot engagement endpoints.

use amora_common::AppResult;
use amora_core::auto_like::AutoLikeReport;
use axum::{Router, extract::State, routing::post};
use chrono::Utc;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Let bots consider liking the caller.
async fn auto_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AutoLikeReport>> {
    state
        .auto_like_limiter
        .enforce(&format!("auto_like:{}", user.id), &state.auto_like_limit)
        .await?;

    let report = state.auto_like_service.run(&user.id, Utc::now()).await?;
    Ok(ApiResponse::ok(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auto-like", post(auto_like))
}
