//! Payment intake with velocity checks.

use amora_common::{AppError, AppResult, IdGenerator, config::PaymentsConfig};
use amora_db::{
    entities::{
        notification::NotificationKind,
        payment::{self, PaymentKind, PaymentStatus},
    },
    repositories::PaymentRepository,
};
use chrono::{Duration, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::Validate;

use super::audit::AuditService;

/// Input for recording a payment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentInput {
    #[validate(length(min = 1, max = 64))]
    pub provider: String,
    pub kind: PaymentKind,
    pub amount: i64,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// A velocity limit the user was at or over when the payment came in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VelocityBreach {
    TooManyPending,
    TooManyPerHour,
    TooManyFailures,
}

/// Stored payment plus the breaches that sent it to review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub payment: payment::Model,
    pub breaches: Vec<VelocityBreach>,
}

/// Payment service.
#[derive(Clone)]
pub struct PaymentService {
    payment_repo: PaymentRepository,
    audit: AuditService,
    limits: PaymentsConfig,
    id_gen: IdGenerator,
}

impl PaymentService {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(
        payment_repo: PaymentRepository,
        audit: AuditService,
        limits: PaymentsConfig,
    ) -> Self {
        Self {
            payment_repo,
            audit,
            limits,
            id_gen: IdGenerator::new(),
        }
    }

    async fn breaches(&self, user_id: &str) -> AppResult<Vec<VelocityBreach>> {
        let now = Utc::now();
        let mut breaches = Vec::new();

        let pending = self
            .payment_repo
            .count_by_status(user_id, PaymentStatus::Pending, None)
            .await?;
        if pending >= self.limits.max_pending_per_user {
            breaches.push(VelocityBreach::TooManyPending);
        }

        let last_hour = self
            .payment_repo
            .count_since(user_id, now - Duration::hours(1))
            .await?;
        if last_hour >= self.limits.max_per_hour {
            breaches.push(VelocityBreach::TooManyPerHour);
        }

        let failures = self
            .payment_repo
            .count_by_status(
                user_id,
                PaymentStatus::Failed,
                Some(now - Duration::hours(24)),
            )
            .await?;
        if failures >= self.limits.max_failures_per_day {
            breaches.push(VelocityBreach::TooManyFailures);
        }

        Ok(breaches)
    }

    /// Record a payment. Velocity breaches park it in `review`.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreatePaymentInput,
    ) -> AppResult<PaymentOutcome> {
        input.validate()?;
        if input.amount <= 0 || input.amount > self.limits.max_amount {
            return Err(AppError::BadRequest(format!(
                "Payment amount must be between 1 and {}",
                self.limits.max_amount
            )));
        }

        let breaches = self.breaches(user_id).await?;
        let status = if breaches.is_empty() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Review
        };

        let model = payment::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            provider: Set(input.provider),
            kind: Set(input.kind),
            amount: Set(input.amount),
            status: Set(status),
            metadata: Set(input.metadata),
            created_at: Set(Utc::now().into()),
        };
        let payment = self.payment_repo.create(model).await?;

        if breaches.is_empty() {
            tracing::info!(user_id = %user_id, payment_id = %payment.id, "Payment recorded");
        } else {
            tracing::warn!(
                user_id = %user_id,
                payment_id = %payment.id,
                breaches = ?breaches,
                "Payment held for review"
            );
            self.audit
                .record(
                    None,
                    "payment.review",
                    Some(user_id),
                    json!({ "paymentId": payment.id, "breaches": breaches }),
                )
                .await;
            self.audit
                .notify(
                    user_id,
                    NotificationKind::PaymentReview,
                    "Your payment is being reviewed.",
                )
                .await;
        }

        Ok(PaymentOutcome { payment, breaches })
    }
}
