//! Bot cooldown repository.

use std::sync::Arc;

use crate::entities::{BotCooldown, bot_cooldown};
use amora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};

/// Repository for per (bot, user) last-interaction timestamps.
#[derive(Clone)]
pub struct CooldownRepository {
    db: Arc<DatabaseConnection>,
}

impl CooldownRepository {
    /// Create a new cooldown repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the record for one pair.
    pub async fn find(
        &self,
        bot_id: &str,
        user_id: &str,
    ) -> AppResult<Option<bot_cooldown::Model>> {
        BotCooldown::find_by_id((bot_id.to_string(), user_id.to_string()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the records between several bots and one user.
    pub async fn find_for_user(
        &self,
        bot_ids: &[String],
        user_id: &str,
    ) -> AppResult<Vec<bot_cooldown::Model>> {
        if bot_ids.is_empty() {
            return Ok(vec![]);
        }

        BotCooldown::find()
            .filter(bot_cooldown::Column::UserId.eq(user_id))
            .filter(bot_cooldown::Column::BotId.is_in(bot_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or overwrite the pair's last interaction time.
    pub async fn upsert(&self, bot_id: &str, user_id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let model = bot_cooldown::ActiveModel {
            bot_id: Set(bot_id.to_string()),
            user_id: Set(user_id.to_string()),
            last_interaction_at: Set(at.into()),
        };

        BotCooldown::insert(model)
            .on_conflict(
                OnConflict::columns([bot_cooldown::Column::BotId, bot_cooldown::Column::UserId])
                    .update_column(bot_cooldown::Column::LastInteractionAt)
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
