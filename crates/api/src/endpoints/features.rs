//! Feature flag endpoints.

use std::collections::BTreeMap;

use amora_common::AppResult;
use amora_core::feature_flags::Tier;
use axum::{Router, extract::State, routing::get};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Caller's tier and resolved flags.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesResponse {
    pub tier: Tier,
    pub flags: BTreeMap<String, bool>,
}

async fn features(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<FeaturesResponse>> {
    let tier = Tier::of(&user);
    let matrix = state.feature_flag_service.matrix().await?;
    Ok(ApiResponse::ok(FeaturesResponse {
        tier,
        flags: matrix.flags(tier).clone(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(features))
}
