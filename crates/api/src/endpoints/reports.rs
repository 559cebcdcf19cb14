//! User report endpoints.

use amora_common::AppResult;
use amora_core::moderation::CreateReportInput;
use amora_db::entities::report::{self, ReportStatus};
use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Report response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub reported_id: String,
    pub reason: String,
    pub status: ReportStatus,
    pub resolved_by: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<report::Model> for ReportResponse {
    fn from(r: report::Model) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            reported_id: r.reported_id,
            reason: r.reason,
            status: r.status,
            resolved_by: r.resolved_by,
            created_at: r.created_at.to_rfc3339(),
            resolved_at: r.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateReportInput>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state.moderation_service.create_report(&user.id, req).await?;
    Ok(ApiResponse::ok(report.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/create", post(create))
}
