//! Time-boxed paid feature access.
//!
//! Buying an unlock runs plan lookup, debit, ledger entry and grant in one
//! database transaction. Unlocks are never merged: each purchase adds a row,
//! and access lasts while any row for the feature is unexpired.

use std::sync::Arc;

use amora_common::{AppError, AppResult, IdGenerator};
use amora_db::{
    entities::{
        access_plan, access_unlock,
        coin_transaction::{self, TransactionKind},
    },
    repositories::{AccessRepository, LedgerRepository, UserRepository},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;
use serde_json::json;

/// Ledger reason recorded for unlock purchases.
pub const UNLOCK_REASON: &str = "access_unlock";

/// Whether an unlock expiring at `expires_at` still grants access at `now`.
#[must_use]
pub fn unlock_active(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at > now
}

/// Result of a purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockOutcome {
    pub unlock: access_unlock::Model,
    pub balance: i64,
}

/// Access unlock service.
#[derive(Clone)]
pub struct AccessUnlockService {
    db: Arc<DatabaseConnection>,
    access_repo: AccessRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl AccessUnlockService {
    /// Create a new access unlock service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        access_repo: AccessRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            db,
            access_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Plans currently on sale.
    pub async fn plans(&self) -> AppResult<Vec<access_plan::Model>> {
        self.access_repo.find_active_plans().await
    }

    /// Buy access to `feature` for the hours its active plan grants.
    pub async fn unlock(
        &self,
        user_id: &str,
        feature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UnlockOutcome> {
        let txn = self.db.begin().await?;

        let Some(plan) = AccessRepository::find_active_plan_on(&txn, feature).await? else {
            txn.rollback().await?;
            return Err(AppError::InvalidAccessPlan(feature.to_string()));
        };

        let Some(user) = UserRepository::debit_on(&txn, user_id, plan.cost).await? else {
            txn.rollback().await?;
            let available = self.user_repo.get_by_id(user_id).await?.coin_balance;
            return Err(AppError::InsufficientBalance {
                required: plan.cost,
                available,
            });
        };

        let entry = coin_transaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            amount: Set(-plan.cost),
            kind: Set(TransactionKind::Spend),
            reason: Set(UNLOCK_REASON.to_string()),
            metadata: Set(Some(json!({
                "feature": feature,
                "planId": plan.id,
                "hours": plan.hours,
            }))),
            created_at: Set(now.into()),
        };
        LedgerRepository::append_on(&txn, entry).await?;

        let grant = access_unlock::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            feature: Set(feature.to_string()),
            plan_id: Set(plan.id.clone()),
            expires_at: Set((now + Duration::hours(i64::from(plan.hours))).into()),
            created_at: Set(now.into()),
        };
        let unlock = AccessRepository::create_unlock_on(&txn, grant).await?;

        txn.commit().await?;

        tracing::info!(
            user_id = %user_id,
            feature = %feature,
            cost = plan.cost,
            expires_at = %unlock.expires_at,
            "Feature unlocked"
        );
        Ok(UnlockOutcome {
            unlock,
            balance: user.coin_balance,
        })
    }

    /// The live unlock for a feature, if any.
    pub async fn active_unlock(
        &self,
        user_id: &str,
        feature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<access_unlock::Model>> {
        let unlock = self
            .access_repo
            .find_live_unlock(user_id, feature, now)
            .await?;
        Ok(unlock.filter(|u| unlock_active(u.expires_at.with_timezone(&Utc), now)))
    }

    /// Whether the user currently has access to `feature`.
    pub async fn has_active_unlock(
        &self,
        user_id: &str,
        feature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self.active_unlock(user_id, feature, now).await?.is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use amora_db::{entities::user, repositories::user::fixtures};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn plan() -> access_plan::Model {
        access_plan::Model {
            id: "plan1".to_string(),
            feature: "profile_visitors".to_string(),
            hours: 24,
            cost: 30,
            is_active: true,
        }
    }

    fn unlock_row(now: DateTime<Utc>) -> access_unlock::Model {
        access_unlock::Model {
            id: "unlock1".to_string(),
            user_id: "user1".to_string(),
            feature: "profile_visitors".to_string(),
            plan_id: "plan1".to_string(),
            expires_at: (now + Duration::hours(24)).into(),
            created_at: now.into(),
        }
    }

    fn service(db: Arc<DatabaseConnection>) -> AccessUnlockService {
        AccessUnlockService::new(
            db.clone(),
            AccessRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    #[test]
    fn test_unlock_active_boundary() {
        let expires = Utc::now();
        assert!(unlock_active(expires, expires - Duration::milliseconds(1)));
        assert!(!unlock_active(expires, expires));
        assert!(!unlock_active(expires, expires + Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_unlock_runs_in_one_transaction() {
        let now = Utc::now();
        let ledger = coin_transaction::Model {
            id: "tx1".to_string(),
            user_id: "user1".to_string(),
            amount: -30,
            kind: TransactionKind::Spend,
            reason: UNLOCK_REASON.to_string(),
            metadata: None,
            created_at: now.into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[plan()]])
                .append_query_results([[fixtures::member("user1", 70)]])
                .append_query_results([[ledger]])
                .append_query_results([[unlock_row(now)]])
                .into_connection(),
        );

        let outcome = service(db.clone())
            .unlock("user1", "profile_visitors", now)
            .await
            .unwrap();
        assert_eq!(outcome.balance, 70);
        assert_eq!(outcome.unlock.expires_at, unlock_row(now).expires_at);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        // Plan lookup, debit, ledger and grant share one transaction
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_feature_is_invalid_plan() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<access_plan::Model>::new()])
                .into_connection(),
        );

        let result = service(db).unlock("user1", "teleport", Utc::now()).await;
        assert!(matches!(result, Err(AppError::InvalidAccessPlan(_))));
    }

    #[tokio::test]
    async fn test_unlock_insufficient_balance() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[plan()]])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[fixtures::member("user1", 10)]])
                .into_connection(),
        );

        let result = service(db)
            .unlock("user1", "profile_visitors", Utc::now())
            .await;
        assert!(matches!(
            result,
            Err(AppError::InsufficientBalance {
                required: 30,
                available: 10
            })
        ));
    }

    #[tokio::test]
    async fn test_has_active_unlock() {
        let now = Utc::now();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[unlock_row(now)]])
                .append_query_results([Vec::<access_unlock::Model>::new()])
                .into_connection(),
        );
        let service = service(db);

        assert!(service
            .has_active_unlock("user1", "profile_visitors", now)
            .await
            .unwrap());
        assert!(!service
            .has_active_unlock("user1", "profile_visitors", now + Duration::hours(24))
            .await
            .unwrap());
    }
}
