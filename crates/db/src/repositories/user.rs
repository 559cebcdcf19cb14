//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use amora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by bearer token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by their (already normalized) referral code.
    pub async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::ReferralCode.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Bot profiles eligible to act on `exclude_id`'s profile.
    ///
    /// Banned bots and the target itself are never returned.
    pub async fn find_active_bots(
        &self,
        exclude_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::IsBot.eq(true))
            .filter(user::Column::IsBanned.eq(false))
            .filter(user::Column::Id.ne(exclude_id))
            .order_by_asc(user::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Debit coins in a single conditional UPDATE.
    ///
    /// The row only changes when the balance covers the amount. Returns the
    /// updated row, or `None` when nothing matched.
    pub async fn debit(&self, user_id: &str, amount: i64) -> AppResult<Option<user::Model>> {
        Self::debit_on(self.db.as_ref(), user_id, amount)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// [`Self::debit`] on an arbitrary connection, so it can join a transaction.
    pub async fn debit_on<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        amount: i64,
    ) -> Result<Option<user::Model>, DbErr> {
        let mut rows = User::update_many()
            .col_expr(
                user::Column::CoinBalance,
                Expr::col(user::Column::CoinBalance).sub(amount),
            )
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::CoinBalance.gte(amount))
            .exec_with_returning(conn)
            .await?;
        Ok(rows.pop())
    }

    /// Debit up to `amount`, never taking the balance below zero.
    ///
    /// The row is locked while the charge is worked out, so the returned
    /// charge is exactly what left the balance. Returns `None` for an
    /// unknown user.
    pub async fn debit_capped(
        &self,
        user_id: &str,
        amount: i64,
    ) -> AppResult<Option<(i64, user::Model)>> {
        let txn = self.db.begin().await?;

        let Some(current) = User::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let charged = amount.min(current.coin_balance.max(0));
        let updated = Self::debit_on(&txn, user_id, charged).await?;
        txn.commit().await?;

        Ok(updated.map(|row| (charged, row)))
    }

    /// Credit coins atomically (single UPDATE query, no fetch).
    pub async fn credit(&self, user_id: &str, amount: i64) -> AppResult<Option<user::Model>> {
        Self::credit_on(self.db.as_ref(), user_id, amount)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// [`Self::credit`] on an arbitrary connection.
    pub async fn credit_on<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        amount: i64,
    ) -> Result<Option<user::Model>, DbErr> {
        let mut rows = User::update_many()
            .col_expr(
                user::Column::CoinBalance,
                Expr::col(user::Column::CoinBalance).add(amount),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec_with_returning(conn)
            .await?;
        Ok(rows.pop())
    }

    /// Record who referred `user_id`, only if nobody has yet.
    ///
    /// Returns `false` when the user already had a referrer.
    pub async fn set_referred_by(&self, user_id: &str, referrer_id: &str) -> AppResult<bool> {
        Self::set_referred_by_on(self.db.as_ref(), user_id, referrer_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// [`Self::set_referred_by`] on an arbitrary connection.
    pub async fn set_referred_by_on<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        referrer_id: &str,
    ) -> Result<bool, DbErr> {
        let result = User::update_many()
            .col_expr(user::Column::ReferredBy, Expr::value(referrer_id))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::ReferredBy.is_null())
            .exec(conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Hide a user from discovery.
    pub async fn hide(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(user::Column::IsHidden, Expr::value(true))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Ban a user. Banned users are hidden as well.
    pub async fn ban(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(user::Column::IsBanned, Expr::value(true))
            .col_expr(user::Column::IsHidden, Expr::value(true))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user. Owned rows go with it through cascading foreign keys.
    pub async fn delete(&self, user_id: &str) -> AppResult<()> {
        User::delete_by_id(user_id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Fixture builders shared by repository and service tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures {
    use crate::entities::user::{self, UserRole};
    use chrono::Utc;

    /// A regular member with the given balance.
    #[must_use]
    pub fn member(id: &str, coin_balance: i64) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            display_name: None,
            gender: None,
            is_bot: false,
            token: Some(format!("token_{id}")),
            role: UserRole::User,
            coin_balance,
            is_premium: false,
            referral_code: id.to_uppercase(),
            referred_by: None,
            is_banned: false,
            is_hidden: false,
            created_at: Utc::now().into(),
        }
    }

    /// A bot profile.
    #[must_use]
    pub fn bot(id: &str) -> user::Model {
        user::Model {
            is_bot: true,
            token: None,
            ..member(id, 0)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::member;
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = member("user1", 10);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_id("user1").await.unwrap().unwrap();
        assert_eq!(found.id, "user1");
        assert_eq!(found.coin_balance, 10);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        match repo.get_by_id("nonexistent").await {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "nonexistent"),
            other => panic!("Expected UserNotFound error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = UserRepository::new(db);
        assert!(repo.find_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guarded_debit_returns_updated_row() {
        let updated = member("user1", 5);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[updated]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let row = repo.debit("user1", 10).await.unwrap().unwrap();
        assert_eq!(row.coin_balance, 5);
    }

    #[tokio::test]
    async fn test_guarded_debit_no_match_returns_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        assert!(repo.debit("user1", 15).await.unwrap().is_none());
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{log:?}");
        assert!(sql.contains("coin_balance"));
        assert!(sql.contains(">="));
    }

    #[tokio::test]
    async fn test_capped_debit_charges_what_was_there() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[member("user1", 3)]])
                .append_query_results([[member("user1", 0)]])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let (charged, row) = repo.debit_capped("user1", 10).await.unwrap().unwrap();
        assert_eq!(charged, 3);
        assert_eq!(row.coin_balance, 0);
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{log:?}");
        assert!(sql.contains("FOR UPDATE"));
        assert!(sql.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_capped_debit_unknown_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.debit_capped("ghost", 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_referred_by_only_once() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.set_referred_by("user2", "user1").await.unwrap());
        assert!(!repo.set_referred_by("user2", "user3").await.unwrap());
    }
}
