//! Key/value application settings repository.

use std::sync::Arc;

use crate::entities::{AppSetting, app_setting};
use amora_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

/// Repository for JSON settings stored by key.
#[derive(Clone)]
pub struct AppSettingRepository {
    db: Arc<DatabaseConnection>,
}

impl AppSettingRepository {
    /// Create a new app setting repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Read a setting's value.
    pub async fn get(&self, key: &str) -> AppResult<Option<serde_json::Value>> {
        let row = AppSetting::find_by_id(key)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(row.map(|r| r.value))
    }

    /// Write a setting's value, replacing any previous one.
    pub async fn set(&self, key: &str, value: serde_json::Value) -> AppResult<()> {
        let model = app_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(Some(Utc::now().into())),
        };

        AppSetting::insert(model)
            .on_conflict(
                OnConflict::column(app_setting::Column::Key)
                    .update_columns([app_setting::Column::Value, app_setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_value() {
        let row = app_setting::Model {
            key: app_setting::FEATURE_FLAGS_KEY.to_string(),
            value: json!({"premium": {"boost": false}}),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row]])
                .into_connection(),
        );

        let repo = AppSettingRepository::new(db);
        let value = repo.get(app_setting::FEATURE_FLAGS_KEY).await.unwrap().unwrap();
        assert_eq!(value["premium"]["boost"], json!(false));
    }
}
