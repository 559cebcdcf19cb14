//! Coin ledger repository.
//!
//! The ledger is append-only: there is no update or delete here.

use std::sync::Arc;

use crate::entities::{CoinTransaction, coin_transaction};
use amora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Ledger repository for database operations.
#[derive(Clone)]
pub struct LedgerRepository {
    db: Arc<DatabaseConnection>,
}

impl LedgerRepository {
    /// Create a new ledger repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn append(
        &self,
        model: coin_transaction::ActiveModel,
    ) -> AppResult<coin_transaction::Model> {
        Self::append_on(self.db.as_ref(), model)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// [`Self::append`] on an arbitrary connection, so it can join a transaction.
    pub async fn append_on<C: ConnectionTrait>(
        conn: &C,
        model: coin_transaction::ActiveModel,
    ) -> Result<coin_transaction::Model, DbErr> {
        model.insert(conn).await
    }

    /// Most recent entries for a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<coin_transaction::Model>> {
        let mut query = CoinTransaction::find()
            .filter(coin_transaction::Column::UserId.eq(user_id))
            .order_by_desc(coin_transaction::Column::Id)
            .limit(limit);

        if let Some(id) = until_id {
            query = query.filter(coin_transaction::Column::Id.lt(id));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
