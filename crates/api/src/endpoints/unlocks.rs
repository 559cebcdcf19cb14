//! Paid feature unlocks.

use amora_common::{AppError, AppResult};
use amora_db::entities::{access_plan, access_unlock};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Feature request.
#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub feature: String,
}

/// Unlock response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub id: String,
    pub feature: String,
    pub expires_at: String,
    pub balance: i64,
}

/// Unlock status response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockStatusResponse {
    pub feature: String,
    pub active: bool,
    /// The caller's tier grants the feature without an unlock.
    pub included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Plan response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: String,
    pub feature: String,
    pub cost: i64,
    pub hours: i32,
}

impl From<access_plan::Model> for PlanResponse {
    fn from(p: access_plan::Model) -> Self {
        Self {
            id: p.id,
            feature: p.feature,
            cost: p.cost,
            hours: p.hours,
        }
    }
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FeatureRequest>,
) -> AppResult<ApiResponse<UnlockResponse>> {
    if state
        .feature_flag_service
        .user_has_feature(&user, &req.feature)
        .await?
    {
        return Err(AppError::Conflict(format!(
            "{} is already included in your tier",
            req.feature
        )));
    }

    let outcome = state
        .access_unlock_service
        .unlock(&user.id, &req.feature, Utc::now())
        .await?;
    Ok(ApiResponse::ok(UnlockResponse {
        id: outcome.unlock.id,
        feature: outcome.unlock.feature,
        expires_at: outcome.unlock.expires_at.to_rfc3339(),
        balance: outcome.balance,
    }))
}

async fn status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FeatureRequest>,
) -> AppResult<ApiResponse<UnlockStatusResponse>> {
    let included = state
        .feature_flag_service
        .user_has_feature(&user, &req.feature)
        .await?;
    let unlock: Option<access_unlock::Model> = if included {
        None
    } else {
        state
            .access_unlock_service
            .active_unlock(&user.id, &req.feature, Utc::now())
            .await?
    };
    Ok(ApiResponse::ok(UnlockStatusResponse {
        feature: req.feature,
        active: included || unlock.is_some(),
        included,
        expires_at: unlock.map(|u| u.expires_at.to_rfc3339()),
    }))
}

async fn plans(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PlanResponse>>> {
    let plans = state.access_unlock_service.plans().await?;
    Ok(ApiResponse::ok(plans.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/status", post(status))
        .route("/plans", get(plans))
}
