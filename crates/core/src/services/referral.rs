//! Referral codes.
//!
//! Linking the referee and crediting both sides commit together, so a failed
//! credit leaves the user free to apply a code again.

use std::sync::Arc;

use amora_common::{AppError, AppResult, config::EconomyConfig, id::normalize_referral_code};
use amora_db::{
    entities::{coin_transaction::TransactionKind, notification::NotificationKind},
    repositories::UserRepository,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use serde_json::json;

use super::{audit::AuditService, economy::EconomyService};

/// Result of applying a referral code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralOutcome {
    pub referrer_id: String,
    pub bonus: i64,
    pub balance: i64,
}

/// Referral service.
#[derive(Clone)]
pub struct ReferralService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    economy: EconomyService,
    audit: AuditService,
    referrer_bonus: i64,
    referee_bonus: i64,
}

impl ReferralService {
    /// Create a new referral service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        user_repo: UserRepository,
        economy: EconomyService,
        audit: AuditService,
        config: &EconomyConfig,
    ) -> Self {
        Self {
            db,
            user_repo,
            economy,
            audit,
            referrer_bonus: config.referrer_bonus,
            referee_bonus: config.referee_bonus,
        }
    }

    /// Apply another user's referral code to `user_id`.
    ///
    /// A user can be referred once. The referrer link and both credits
    /// run in one transaction.
    pub async fn apply(&self, user_id: &str, code: &str) -> AppResult<ReferralOutcome> {
        let code = normalize_referral_code(code);
        if code.is_empty() {
            return Err(AppError::BadRequest("Referral code is required".to_string()));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        if user.referred_by.is_some() {
            return Err(AppError::Conflict(
                "A referral code was already applied".to_string(),
            ));
        }

        let referrer = self
            .user_repo
            .find_by_referral_code(&code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Referral code {code} not found")))?;
        if referrer.id == user.id {
            return Err(AppError::BadRequest(
                "Cannot apply your own referral code".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        // Lost a race with another apply for the same user
        if !UserRepository::set_referred_by_on(&txn, user_id, &referrer.id).await? {
            txn.rollback().await?;
            return Err(AppError::Conflict(
                "A referral code was already applied".to_string(),
            ));
        }

        if self.referrer_bonus > 0 {
            self.economy
                .earn_on(
                    &txn,
                    &referrer.id,
                    self.referrer_bonus,
                    TransactionKind::Bonus,
                    "referral",
                    Some(json!({ "refereeId": user_id })),
                )
                .await?;
        }

        let balance = if self.referee_bonus > 0 {
            self.economy
                .earn_on(
                    &txn,
                    user_id,
                    self.referee_bonus,
                    TransactionKind::Bonus,
                    "referral_welcome",
                    Some(json!({ "referrerId": referrer.id })),
                )
                .await?
                .balance
        } else {
            user.coin_balance
        };

        txn.commit().await?;

        if self.referrer_bonus > 0 {
            self.audit
                .notify(
                    &referrer.id,
                    NotificationKind::CoinsCredited,
                    &format!("You earned {} coins for a referral.", self.referrer_bonus),
                )
                .await;
        }

        tracing::info!(user_id = %user_id, referrer_id = %referrer.id, "Referral applied");
        Ok(ReferralOutcome {
            referrer_id: referrer.id,
            bonus: self.referee_bonus,
            balance,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use amora_db::{
        entities::{coin_transaction, notification, user},
        repositories::{
            AppSettingRepository, AuditLogRepository, LedgerRepository, NotificationRepository,
            user::fixtures,
        },
    };
    use crate::services::feature_flags::FeatureFlagService;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: &Arc<DatabaseConnection>) -> ReferralService {
        let user_repo = UserRepository::new(db.clone());
        let config = EconomyConfig::default();
        ReferralService::new(
            db.clone(),
            user_repo.clone(),
            EconomyService::new(
                user_repo,
                LedgerRepository::new(db.clone()),
                FeatureFlagService::new(AppSettingRepository::new(db.clone())),
                &config,
            ),
            AuditService::new(
                AuditLogRepository::new(db.clone()),
                NotificationRepository::new(db.clone()),
            ),
            &config,
        )
    }

    #[tokio::test]
    async fn test_own_code_rejected() {
        let me = fixtures::member("alice", 0);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[me.clone()], [me]])
                .into_connection(),
        );

        let result = service(&db).apply("alice", " alice ").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_second_application_rejected() {
        let me = user::Model {
            referred_by: Some("bob".to_string()),
            ..fixtures::member("alice", 0)
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[me]])
                .into_connection(),
        );

        let result = service(&db).apply("alice", "CAROL").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![fixtures::member("alice", 0)], vec![]])
                .into_connection(),
        );

        let result = service(&db).apply("alice", "NOPE").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_code() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let result = service(&db).apply("alice", "   ").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_apply_credits_both_sides() {
        let now = chrono::Utc::now();
        let ledger = |user_id: &str, amount: i64| coin_transaction::Model {
            id: format!("tx_{user_id}"),
            user_id: user_id.to_string(),
            amount,
            kind: TransactionKind::Bonus,
            reason: "referral".to_string(),
            metadata: None,
            created_at: now.into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::member("alice", 0)]])
                .append_query_results([[fixtures::member("bob", 10)]])
                .append_query_results([[fixtures::member("bob", 60)]])
                .append_query_results([[ledger("bob", 50)]])
                .append_query_results([[fixtures::member("alice", 25)]])
                .append_query_results([[ledger("alice", 25)]])
                .append_query_results([[notification::Model {
                    id: "n1".to_string(),
                    user_id: "bob".to_string(),
                    kind: NotificationKind::CoinsCredited,
                    body: String::new(),
                    is_read: false,
                    created_at: now.into(),
                }]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let outcome = service(&db).apply("alice", "bob").await.unwrap();
        assert_eq!(outcome.referrer_id, "bob");
        assert_eq!(outcome.bonus, 25);
        assert_eq!(outcome.balance, 25);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let committed = log
            .iter()
            .map(|t| format!("{t:?}"))
            .find(|t| t.contains("BEGIN"))
            .unwrap();
        assert!(committed.contains("COMMIT"));
        assert!(committed.contains("coin_transaction"));
    }

    #[tokio::test]
    async fn test_failed_credit_rolls_back_link() {
        let now = chrono::Utc::now();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::member("alice", 0)]])
                .append_query_results([[fixtures::member("bob", 10)]])
                .append_query_results([[fixtures::member("bob", 60)]])
                .append_query_results([[coin_transaction::Model {
                    id: "tx_bob".to_string(),
                    user_id: "bob".to_string(),
                    amount: 50,
                    kind: TransactionKind::Bonus,
                    reason: "referral".to_string(),
                    metadata: None,
                    created_at: now.into(),
                }]])
                // Referee credit matches no row
                .append_query_results([Vec::<user::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let result = service(&db).apply("alice", "bob").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let txn = log
            .iter()
            .map(|t| format!("{t:?}"))
            .find(|t| t.contains("BEGIN"))
            .unwrap();
        assert!(txn.contains("ROLLBACK"));
        assert!(!txn.contains("COMMIT"));
        // No notification for a bonus that never landed
        assert!(!log.iter().any(|t| format!("{t:?}").contains("notification")));
    }

    #[tokio::test]
    async fn test_lost_race_is_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::member("alice", 0)]])
                .append_query_results([[fixtures::member("bob", 10)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let result = service(&db).apply("alice", "bob").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
