//! Bot settings repository: global defaults, groups and per-bot configs.

use std::sync::Arc;

use crate::entities::{
    BotConfig, BotGlobalSettings, BotGroup, bot_config,
    bot_global_settings::{self, BOT_GLOBAL_SETTINGS_ID},
    bot_group,
};
use amora_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Repository for the three layers of bot behavior settings.
#[derive(Clone)]
pub struct BotRepository {
    db: Arc<DatabaseConnection>,
}

impl BotRepository {
    /// Create a new bot repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ========== Global settings ==========

    /// Find the singleton global settings row.
    pub async fn find_global(&self) -> AppResult<Option<bot_global_settings::Model>> {
        BotGlobalSettings::find_by_id(BOT_GLOBAL_SETTINGS_ID)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert the global settings row.
    pub async fn create_global(
        &self,
        model: bot_global_settings::ActiveModel,
    ) -> AppResult<bot_global_settings::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update the global settings row.
    pub async fn update_global(
        &self,
        model: bot_global_settings::ActiveModel,
    ) -> AppResult<bot_global_settings::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ========== Groups ==========

    /// Find a group by ID.
    pub async fn find_group(&self, id: &str) -> AppResult<Option<bot_group::Model>> {
        BotGroup::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find groups by IDs.
    pub async fn find_groups_by_ids(&self, ids: &[String]) -> AppResult<Vec<bot_group::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        BotGroup::find()
            .filter(bot_group::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a group.
    pub async fn create_group(&self, model: bot_group::ActiveModel) -> AppResult<bot_group::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a group.
    pub async fn update_group(&self, model: bot_group::ActiveModel) -> AppResult<bot_group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ========== Per-bot configs ==========

    /// Find the config of a single bot.
    pub async fn find_config(&self, user_id: &str) -> AppResult<Option<bot_config::Model>> {
        BotConfig::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find configs for a batch of bots. Bots without a row are simply absent.
    pub async fn find_configs_by_user_ids(
        &self,
        user_ids: &[String],
    ) -> AppResult<Vec<bot_config::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        BotConfig::find()
            .filter(bot_config::Column::UserId.is_in(user_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a bot config.
    pub async fn create_config(
        &self,
        model: bot_config::ActiveModel,
    ) -> AppResult<bot_config::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a bot config.
    pub async fn update_config(
        &self,
        model: bot_config::ActiveModel,
    ) -> AppResult<bot_config::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn config(user_id: &str, group_id: Option<&str>) -> bot_config::Model {
        bot_config::Model {
            user_id: user_id.to_string(),
            personality_prompt: None,
            tone: None,
            auto_like_rate: Some(40),
            cooldown_hours: None,
            active_hours: Some(json!([9, 10, 11])),
            use_global: true,
            is_active: true,
            group_id: group_id.map(ToString::to_string),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_global_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<bot_global_settings::Model>::new()])
                .into_connection(),
        );

        let repo = BotRepository::new(db);
        assert!(repo.find_global().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_configs_by_user_ids() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[config("bot1", Some("g1")), config("bot2", None)]])
                .into_connection(),
        );

        let repo = BotRepository::new(db);
        let configs = repo
            .find_configs_by_user_ids(&["bot1".to_string(), "bot2".to_string()])
            .await
            .unwrap();

        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].group_id.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn test_batch_lookups_skip_query_when_empty() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = BotRepository::new(db);

        assert!(repo.find_configs_by_user_ids(&[]).await.unwrap().is_empty());
        assert!(repo.find_groups_by_ids(&[]).await.unwrap().is_empty());
    }
}
