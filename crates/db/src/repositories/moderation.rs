//! Moderation repository for user reports and threshold settings.

use std::sync::Arc;

use crate::entities::{
    ModerationSettings, Report,
    moderation_settings::{self, MODERATION_SETTINGS_ID},
    report::{self, ReportStatus},
};
use amora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Moderation repository for database operations.
#[derive(Clone)]
pub struct ModerationRepository {
    db: Arc<DatabaseConnection>,
}

impl ModerationRepository {
    /// Create a new moderation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ========== Reports ==========

    /// Create a new report.
    pub async fn create_report(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report by ID.
    pub async fn get_report(&self, id: &str) -> AppResult<report::Model> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Report {id} not found")))
    }

    /// Update a report.
    pub async fn update_report(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get pending reports, newest first.
    pub async fn get_pending_reports(
        &self,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .order_by_desc(report::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The `reported_id` of every pending report, one entry per report.
    ///
    /// Callers tally these to get per-user counts.
    pub async fn pending_reported_ids(&self) -> AppResult<Vec<String>> {
        Report::find()
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .select_only()
            .column(report::Column::ReportedId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count pending reports against a user.
    pub async fn count_pending_for_user(&self, user_id: &str) -> AppResult<u64> {
        Report::find()
            .filter(report::Column::ReportedId.eq(user_id))
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ========== Settings ==========

    /// Find the moderation thresholds row.
    pub async fn find_settings(&self) -> AppResult<Option<moderation_settings::Model>> {
        ModerationSettings::find_by_id(MODERATION_SETTINGS_ID)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
