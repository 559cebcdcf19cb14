//! Moderator and admin endpoints.

use amora_common::{AppError, AppResult};
use amora_core::{
    bot_settings::{
        EffectiveBotSettings, GlobalBotSettings, UpdateGlobalSettingsInput, UpsertBotConfigInput,
        UpsertGroupInput,
    },
    feature_flags::FeatureMatrix,
    moderation::{ModerationRunReport, ResolveReportInput},
    risk::RiskAssessment,
};
use amora_db::entities::{
    bot_config, bot_group,
    user::{self, UserRole},
};
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::Value;

use super::reports::ReportResponse;
use crate::{extractors::StaffUser, middleware::AppState, response::ApiResponse};

/// Pending reports request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReportsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    10
}

/// Request naming one user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: String,
}

/// Request naming one bot.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotIdRequest {
    pub bot_id: String,
}

/// Bot config upsert request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertBotConfigRequest {
    pub bot_id: String,
    #[serde(flatten)]
    pub config: UpsertBotConfigInput,
}

fn require_admin(user: &user::Model) -> AppResult<()> {
    if user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}

// ==================== Moderation ====================

async fn run_moderation(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ModerationRunReport>> {
    let report = state.moderation_service.run(Some(&user.id)).await?;
    Ok(ApiResponse::ok(report))
}

async fn pending_reports(
    StaffUser(_user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<PendingReportsRequest>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state
        .moderation_service
        .pending_reports(req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(reports.into_iter().map(Into::into).collect()))
}

async fn resolve_report(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<ResolveReportInput>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .moderation_service
        .resolve_report(&user.id, req)
        .await?;
    Ok(ApiResponse::ok(report.into()))
}

async fn recompute_risk(
    StaffUser(_user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<RiskAssessment>> {
    let assessment = state.risk_service.recompute(&req.user_id).await?;
    Ok(ApiResponse::ok(assessment))
}

// ==================== Feature flags ====================

async fn update_features(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(overrides): Json<Value>,
) -> AppResult<ApiResponse<FeatureMatrix>> {
    require_admin(&user)?;
    let matrix = state.feature_flag_service.set_overrides(overrides).await?;
    Ok(ApiResponse::ok(matrix))
}

// ==================== Bot settings ====================

async fn global_settings(
    StaffUser(_user): StaffUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Option<GlobalBotSettings>>> {
    Ok(ApiResponse::ok(state.bot_settings_service.global().await?))
}

async fn update_global_settings(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateGlobalSettingsInput>,
) -> AppResult<ApiResponse<GlobalBotSettings>> {
    require_admin(&user)?;
    let settings = state.bot_settings_service.update_global(req).await?;
    Ok(ApiResponse::ok(settings))
}

async fn upsert_group(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<UpsertGroupInput>,
) -> AppResult<ApiResponse<bot_group::Model>> {
    require_admin(&user)?;
    let group = state.bot_settings_service.upsert_group(req).await?;
    Ok(ApiResponse::ok(group))
}

async fn upsert_config(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<UpsertBotConfigRequest>,
) -> AppResult<ApiResponse<bot_config::Model>> {
    require_admin(&user)?;
    let config = state
        .bot_settings_service
        .upsert_config(&req.bot_id, req.config)
        .await?;
    Ok(ApiResponse::ok(config))
}

async fn effective_settings(
    StaffUser(_user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<BotIdRequest>,
) -> AppResult<ApiResponse<EffectiveBotSettings>> {
    let settings = state.bot_settings_service.effective_for(&req.bot_id).await?;
    Ok(ApiResponse::ok(settings))
}

pub fn router() -> Router<AppState> {
    Router::new()
        // Moderation
        .route("/moderation/run", post(run_moderation))
        .route("/reports/pending", post(pending_reports))
        .route("/reports/resolve", post(resolve_report))
        .route("/risk/recompute", post(recompute_risk))
        // Feature flags
        .route("/features/update", post(update_features))
        // Bot settings
        .route("/bots/settings", post(global_settings))
        .route("/bots/settings/update", post(update_global_settings))
        .route("/bots/groups/upsert", post(upsert_group))
        .route("/bots/configs/upsert", post(upsert_config))
        .route("/bots/effective", post(effective_settings))
}
