//! Access plan and unlock repository.

use std::sync::Arc;

use crate::entities::{AccessPlan, AccessUnlock, access_plan, access_unlock};
use amora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};

/// Repository for rentable feature access.
#[derive(Clone)]
pub struct AccessRepository {
    db: Arc<DatabaseConnection>,
}

impl AccessRepository {
    /// Create a new access repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Active plans, cheapest first.
    pub async fn find_active_plans(&self) -> AppResult<Vec<access_plan::Model>> {
        AccessPlan::find()
            .filter(access_plan::Column::IsActive.eq(true))
            .order_by_asc(access_plan::Column::Feature)
            .order_by_asc(access_plan::Column::Cost)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The active plan for a feature on an arbitrary connection.
    pub async fn find_active_plan_on<C: ConnectionTrait>(
        conn: &C,
        feature: &str,
    ) -> Result<Option<access_plan::Model>, DbErr> {
        AccessPlan::find()
            .filter(access_plan::Column::Feature.eq(feature))
            .filter(access_plan::Column::IsActive.eq(true))
            .order_by_asc(access_plan::Column::Cost)
            .one(conn)
            .await
    }

    /// Insert an unlock on an arbitrary connection.
    pub async fn create_unlock_on<C: ConnectionTrait>(
        conn: &C,
        model: access_unlock::ActiveModel,
    ) -> Result<access_unlock::Model, DbErr> {
        model.insert(conn).await
    }

    /// The unlock for a feature that expires last, if any is still live at `now`.
    pub async fn find_live_unlock(
        &self,
        user_id: &str,
        feature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<access_unlock::Model>> {
        AccessUnlock::find()
            .filter(access_unlock::Column::UserId.eq(user_id))
            .filter(access_unlock::Column::Feature.eq(feature))
            .filter(access_unlock::Column::ExpiresAt.gt(now))
            .order_by_desc(access_unlock::Column::ExpiresAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
