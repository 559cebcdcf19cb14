//! Risk score repository.

use std::sync::Arc;

use crate::entities::{RiskScore, risk_score};
use amora_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, EntityTrait, sea_query::OnConflict};

/// Repository for derived per-user risk scores.
#[derive(Clone)]
pub struct RiskScoreRepository {
    db: Arc<DatabaseConnection>,
}

impl RiskScoreRepository {
    /// Create a new risk score repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's current score.
    pub async fn find(&self, user_id: &str) -> AppResult<Option<risk_score::Model>> {
        RiskScore::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the user's score wholesale.
    pub async fn upsert(&self, model: risk_score::ActiveModel) -> AppResult<()> {
        RiskScore::insert(model)
            .on_conflict(
                OnConflict::column(risk_score::Column::UserId)
                    .update_columns([
                        risk_score::Column::Score,
                        risk_score::Column::Reasons,
                        risk_score::Column::ComputedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
