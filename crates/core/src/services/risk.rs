//! Per-user risk score, recomputed from reports and payments.

use std::collections::BTreeMap;

use amora_common::AppResult;
use amora_db::{
    entities::{payment::PaymentStatus, risk_score},
    repositories::{ModerationRepository, PaymentRepository, RiskScoreRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;

const PENDING_REPORT_WEIGHT: u64 = 10;
const FAILED_PAYMENT_WEIGHT: u64 = 5;
const REVIEW_PAYMENT_WEIGHT: u64 = 15;
const BANNED_WEIGHT: u64 = 50;
const MAX_SCORE: u64 = 100;

/// Signals that feed the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSignals {
    pub pending_reports: u64,
    pub failed_payments: u64,
    pub review_payments: u64,
    pub banned: bool,
}

/// A computed score and how much each signal contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub score: i32,
    pub reasons: BTreeMap<&'static str, u64>,
}

/// Weigh the signals. Zero contributions are left out of `reasons`.
#[must_use]
pub fn assess(signals: &RiskSignals) -> RiskAssessment {
    let contributions = [
        ("pendingReports", signals.pending_reports * PENDING_REPORT_WEIGHT),
        ("failedPayments", signals.failed_payments * FAILED_PAYMENT_WEIGHT),
        ("reviewPayments", signals.review_payments * REVIEW_PAYMENT_WEIGHT),
        ("banned", if signals.banned { BANNED_WEIGHT } else { 0 }),
    ];

    let reasons: BTreeMap<&'static str, u64> = contributions
        .into_iter()
        .filter(|(_, points)| *points > 0)
        .collect();
    let total = reasons.values().fold(0_u64, |acc, p| acc.saturating_add(*p));

    RiskAssessment {
        score: total.min(MAX_SCORE) as i32,
        reasons,
    }
}

/// Risk score service.
#[derive(Clone)]
pub struct RiskService {
    risk_repo: RiskScoreRepository,
    user_repo: UserRepository,
    moderation_repo: ModerationRepository,
    payment_repo: PaymentRepository,
}

impl RiskService {
    /// Create a new risk service.
    #[must_use]
    pub const fn new(
        risk_repo: RiskScoreRepository,
        user_repo: UserRepository,
        moderation_repo: ModerationRepository,
        payment_repo: PaymentRepository,
    ) -> Self {
        Self {
            risk_repo,
            user_repo,
            moderation_repo,
            payment_repo,
        }
    }

    /// Recompute and store a user's score.
    pub async fn recompute(&self, user_id: &str) -> AppResult<RiskAssessment> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let signals = RiskSignals {
            pending_reports: self.moderation_repo.count_pending_for_user(user_id).await?,
            failed_payments: self
                .payment_repo
                .count_by_status(user_id, PaymentStatus::Failed, None)
                .await?,
            review_payments: self
                .payment_repo
                .count_by_status(user_id, PaymentStatus::Review, None)
                .await?,
            banned: user.is_banned,
        };

        let assessment = assess(&signals);
        self.risk_repo
            .upsert(risk_score::ActiveModel {
                user_id: Set(user_id.to_string()),
                score: Set(assessment.score),
                reasons: Set(serde_json::to_value(&assessment.reasons)?),
                computed_at: Set(Utc::now().into()),
            })
            .await?;

        tracing::debug!(user_id = %user_id, score = assessment.score, "Risk score recomputed");
        Ok(assessment)
    }
}
