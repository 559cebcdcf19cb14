//! Payment repository.

use std::sync::Arc;

use crate::entities::{
    Payment,
    payment::{self, PaymentStatus},
};
use amora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

/// Payment repository for database operations.
#[derive(Clone)]
pub struct PaymentRepository {
    db: Arc<DatabaseConnection>,
}

impl PaymentRepository {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a payment.
    pub async fn create(&self, model: payment::ActiveModel) -> AppResult<payment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's payments in a status, optionally only those created after `since`.
    pub async fn count_by_status(
        &self,
        user_id: &str,
        status: PaymentStatus,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        let mut query = Payment::find()
            .filter(payment::Column::UserId.eq(user_id))
            .filter(payment::Column::Status.eq(status));

        if let Some(since) = since {
            query = query.filter(payment::Column::CreatedAt.gte(since));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count every payment a user created after `since`.
    pub async fn count_since(&self, user_id: &str, since: DateTime<Utc>) -> AppResult<u64> {
        Payment::find()
            .filter(payment::Column::UserId.eq(user_id))
            .filter(payment::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
