//! Payment endpoints.

use amora_common::AppResult;
use amora_core::payment::{CreatePaymentInput, VelocityBreach};
use amora_db::entities::payment::{PaymentKind, PaymentStatus};
use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Payment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub provider: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub status: PaymentStatus,
    pub breaches: Vec<VelocityBreach>,
    pub created_at: String,
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentInput>,
) -> AppResult<ApiResponse<PaymentResponse>> {
    let outcome = state.payment_service.create(&user.id, req).await?;
    let payment = outcome.payment;
    Ok(ApiResponse::ok(PaymentResponse {
        id: payment.id,
        provider: payment.provider,
        kind: payment.kind,
        amount: payment.amount,
        status: payment.status,
        breaches: outcome.breaches,
        created_at: payment.created_at.to_rfc3339(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/create", post(create))
}
