//! Bot behavior settings and their override chain.
//!
//! Effective settings come from three layers: the bot's own config, its
//! group, and the global singleton. A bot with `use_global = false` reads its
//! own fields; otherwise its group's fields apply when it has one. Every field
//! left unset falls back to the global value, and a missing global row falls
//! back to the built-in defaults.

use std::collections::BTreeSet;

use amora_common::{AppError, AppResult, IdGenerator};
use amora_db::{
    entities::{
        bot_config, bot_global_settings::{self, BOT_GLOBAL_SETTINGS_ID}, bot_group,
    },
    repositories::{BotRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Like probability used when nothing is configured, in percent.
pub const DEFAULT_AUTO_LIKE_RATE: i32 = 5;

/// Cooldown used when nothing is configured, in hours.
pub const DEFAULT_COOLDOWN_HOURS: i32 = 72;

/// UTC hours a bot may act in. Empty means every hour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActiveHours(BTreeSet<u8>);

impl ActiveHours {
    /// Build from a list of hours, rejecting anything outside 0..=23.
    pub fn from_hours(hours: &[u8]) -> AppResult<Self> {
        if let Some(bad) = hours.iter().find(|h| **h > 23) {
            return Err(AppError::Validation(format!(
                "Active hour {bad} is outside 0-23"
            )));
        }
        Ok(Self(hours.iter().copied().collect()))
    }

    /// Parse a stored JSON array of hours.
    pub fn from_json(value: &Value) -> AppResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| AppError::Validation("Active hours must be an array".to_string()))?;

        let hours = items
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|h| u8::try_from(h).ok())
                    .ok_or_else(|| AppError::Validation(format!("Invalid active hour: {v}")))
            })
            .collect::<AppResult<Vec<u8>>>()?;

        Self::from_hours(&hours)
    }

    /// Whether the bot may act during `hour`.
    #[must_use]
    pub fn allows(&self, hour: u32) -> bool {
        self.0.is_empty() || u8::try_from(hour).is_ok_and(|h| self.0.contains(&h))
    }

    /// True when no hours are listed, meaning the bot may act at any hour.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    fn to_json(&self) -> Value {
        Value::from(self.0.iter().copied().collect::<Vec<u8>>())
    }
}

/// One override layer: any field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsLayer {
    pub auto_like_rate: Option<i32>,
    pub cooldown_hours: Option<i32>,
    pub active_hours: Option<ActiveHours>,
}

/// The global singleton, typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalBotSettings {
    pub auto_like_enabled: bool,
    pub auto_like_rate: i32,
    pub cooldown_hours: i32,
    pub active_hours: ActiveHours,
    pub auto_story: bool,
    pub profile_rotation_minutes: i32,
}

impl Default for GlobalBotSettings {
    fn default() -> Self {
        Self {
            auto_like_enabled: true,
            auto_like_rate: DEFAULT_AUTO_LIKE_RATE,
            cooldown_hours: DEFAULT_COOLDOWN_HOURS,
            active_hours: ActiveHours::default(),
            auto_story: false,
            profile_rotation_minutes: 0,
        }
    }
}

/// A bot's own config, typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotOverrides {
    pub use_global: bool,
    pub is_active: bool,
    pub group_id: Option<String>,
    pub layer: SettingsLayer,
}

/// The settings a bot actually runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBotSettings {
    pub auto_like_rate: i32,
    pub cooldown_hours: i32,
    pub active_hours: ActiveHours,
}

/// Resolve the effective settings for one bot.
///
/// `group` is only consulted when the bot defers to shared settings.
#[must_use]
pub fn resolve_effective(
    global: Option<&GlobalBotSettings>,
    group: Option<&SettingsLayer>,
    config: Option<&BotOverrides>,
) -> EffectiveBotSettings {
    let defaults = GlobalBotSettings::default();
    let global = global.unwrap_or(&defaults);

    let layer = match config {
        Some(c) if !c.use_global => Some(&c.layer),
        _ => group,
    };

    match layer {
        Some(layer) => EffectiveBotSettings {
            auto_like_rate: layer.auto_like_rate.unwrap_or(global.auto_like_rate),
            cooldown_hours: layer.cooldown_hours.unwrap_or(global.cooldown_hours),
            active_hours: layer
                .active_hours
                .clone()
                .unwrap_or_else(|| global.active_hours.clone()),
        },
        None => EffectiveBotSettings {
            auto_like_rate: global.auto_like_rate,
            cooldown_hours: global.cooldown_hours,
            active_hours: global.active_hours.clone(),
        },
    }
}

/// Parse a nullable active-hours column. Malformed values are logged and
/// treated as unset so the next layer applies.
fn stored_hours(value: Option<&Value>, owner: &str) -> Option<ActiveHours> {
    let value = value?;
    match ActiveHours::from_json(value) {
        Ok(hours) => Some(hours),
        Err(e) => {
            tracing::warn!(owner = %owner, error = %e, "Ignoring malformed active hours");
            None
        }
    }
}

impl From<&bot_global_settings::Model> for GlobalBotSettings {
    fn from(m: &bot_global_settings::Model) -> Self {
        Self {
            auto_like_enabled: m.auto_like_enabled,
            auto_like_rate: m.auto_like_rate,
            cooldown_hours: m.cooldown_hours,
            active_hours: stored_hours(Some(&m.active_hours), &m.id).unwrap_or_default(),
            auto_story: m.auto_story,
            profile_rotation_minutes: m.profile_rotation_minutes,
        }
    }
}

impl From<&bot_group::Model> for SettingsLayer {
    fn from(m: &bot_group::Model) -> Self {
        Self {
            auto_like_rate: m.auto_like_rate,
            cooldown_hours: m.cooldown_hours,
            active_hours: stored_hours(m.active_hours.as_ref(), &m.id),
        }
    }
}

impl From<&bot_config::Model> for BotOverrides {
    fn from(m: &bot_config::Model) -> Self {
        Self {
            use_global: m.use_global,
            is_active: m.is_active,
            group_id: m.group_id.clone(),
            layer: SettingsLayer {
                auto_like_rate: m.auto_like_rate,
                cooldown_hours: m.cooldown_hours,
                active_hours: stored_hours(m.active_hours.as_ref(), &m.user_id),
            },
        }
    }
}

/// Input for updating the global settings. Unset fields keep their value.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGlobalSettingsInput {
    pub auto_like_enabled: Option<bool>,
    #[validate(range(min = 0, max = 100))]
    pub auto_like_rate: Option<i32>,
    #[validate(range(min = 0))]
    pub cooldown_hours: Option<i32>,
    pub active_hours: Option<Vec<u8>>,
    pub auto_story: Option<bool>,
    #[validate(range(min = 0))]
    pub profile_rotation_minutes: Option<i32>,
}

/// Input for creating or updating a bot group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertGroupInput {
    /// Existing group to update; a new group is created when absent.
    pub group_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(range(min = 0, max = 100))]
    pub auto_like_rate: Option<i32>,
    #[validate(range(min = 0))]
    pub cooldown_hours: Option<i32>,
    pub active_hours: Option<Vec<u8>>,
    #[validate(range(min = 0))]
    pub min_response_delay_secs: Option<i32>,
    #[validate(range(min = 0))]
    pub max_response_delay_secs: Option<i32>,
}

/// Input for creating or replacing a bot's own config.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertBotConfigInput {
    #[validate(length(max = 4000))]
    pub personality_prompt: Option<String>,
    #[validate(length(max = 64))]
    pub tone: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub auto_like_rate: Option<i32>,
    #[validate(range(min = 0))]
    pub cooldown_hours: Option<i32>,
    pub active_hours: Option<Vec<u8>>,
    #[serde(default = "default_true")]
    pub use_global: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub group_id: Option<String>,
}

const fn default_true() -> bool {
    true
}

fn hours_json(hours: Option<&[u8]>) -> AppResult<Option<Value>> {
    hours
        .map(|h| ActiveHours::from_hours(h).map(|a| a.to_json()))
        .transpose()
}

/// Service for reading and editing bot settings.
#[derive(Clone)]
pub struct BotSettingsService {
    bot_repo: BotRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl BotSettingsService {
    /// Create a new bot settings service.
    #[must_use]
    pub const fn new(bot_repo: BotRepository, user_repo: UserRepository) -> Self {
        Self {
            bot_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// The global settings, or `None` when the row has never been written.
    pub async fn global(&self) -> AppResult<Option<GlobalBotSettings>> {
        Ok(self
            .bot_repo
            .find_global()
            .await?
            .as_ref()
            .map(GlobalBotSettings::from))
    }

    /// Effective settings for one bot.
    pub async fn effective_for(&self, bot_id: &str) -> AppResult<EffectiveBotSettings> {
        let global = self.global().await?;
        let config = self.bot_repo.find_config(bot_id).await?;
        let overrides = config.as_ref().map(BotOverrides::from);

        let group = match overrides.as_ref().and_then(|o| o.group_id.as_deref()) {
            Some(group_id) => self.bot_repo.find_group(group_id).await?,
            None => None,
        };
        let group_layer = group.as_ref().map(SettingsLayer::from);

        Ok(resolve_effective(
            global.as_ref(),
            group_layer.as_ref(),
            overrides.as_ref(),
        ))
    }

    /// Update the global settings, creating the row on first write.
    pub async fn update_global(
        &self,
        input: UpdateGlobalSettingsInput,
    ) -> AppResult<GlobalBotSettings> {
        input.validate()?;
        let active_hours = hours_json(input.active_hours.as_deref())?;
        let now = Utc::now();

        let saved = if let Some(existing) = self.bot_repo.find_global().await? {
            let mut active: bot_global_settings::ActiveModel = existing.into();
            if let Some(v) = input.auto_like_enabled {
                active.auto_like_enabled = Set(v);
            }
            if let Some(v) = input.auto_like_rate {
                active.auto_like_rate = Set(v);
            }
            if let Some(v) = input.cooldown_hours {
                active.cooldown_hours = Set(v);
            }
            if let Some(v) = active_hours {
                active.active_hours = Set(v);
            }
            if let Some(v) = input.auto_story {
                active.auto_story = Set(v);
            }
            if let Some(v) = input.profile_rotation_minutes {
                active.profile_rotation_minutes = Set(v);
            }
            active.updated_at = Set(Some(now.into()));
            self.bot_repo.update_global(active).await?
        } else {
            let defaults = GlobalBotSettings::default();
            let model = bot_global_settings::ActiveModel {
                id: Set(BOT_GLOBAL_SETTINGS_ID.to_string()),
                auto_like_enabled: Set(input.auto_like_enabled.unwrap_or(defaults.auto_like_enabled)),
                auto_like_rate: Set(input.auto_like_rate.unwrap_or(defaults.auto_like_rate)),
                cooldown_hours: Set(input.cooldown_hours.unwrap_or(defaults.cooldown_hours)),
                active_hours: Set(active_hours.unwrap_or_else(|| defaults.active_hours.to_json())),
                auto_story: Set(input.auto_story.unwrap_or(defaults.auto_story)),
                profile_rotation_minutes: Set(input
                    .profile_rotation_minutes
                    .unwrap_or(defaults.profile_rotation_minutes)),
                updated_at: Set(Some(now.into())),
            };
            self.bot_repo.create_global(model).await?
        };

        tracing::info!(
            auto_like_enabled = saved.auto_like_enabled,
            auto_like_rate = saved.auto_like_rate,
            "Updated global bot settings"
        );
        Ok(GlobalBotSettings::from(&saved))
    }

    /// Create or update a bot group.
    pub async fn upsert_group(&self, input: UpsertGroupInput) -> AppResult<bot_group::Model> {
        input.validate()?;
        if let (Some(min), Some(max)) = (input.min_response_delay_secs, input.max_response_delay_secs)
        {
            if min > max {
                return Err(AppError::Validation(
                    "Minimum response delay exceeds maximum".to_string(),
                ));
            }
        }
        let active_hours = hours_json(input.active_hours.as_deref())?;

        if let Some(group_id) = input.group_id {
            let existing = self
                .bot_repo
                .find_group(&group_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Bot group {group_id} not found")))?;

            let mut active: bot_group::ActiveModel = existing.into();
            active.name = Set(input.name);
            active.auto_like_rate = Set(input.auto_like_rate);
            active.cooldown_hours = Set(input.cooldown_hours);
            active.active_hours = Set(active_hours);
            active.min_response_delay_secs = Set(input.min_response_delay_secs);
            active.max_response_delay_secs = Set(input.max_response_delay_secs);
            return self.bot_repo.update_group(active).await;
        }

        let model = bot_group::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            auto_like_rate: Set(input.auto_like_rate),
            cooldown_hours: Set(input.cooldown_hours),
            active_hours: Set(active_hours),
            min_response_delay_secs: Set(input.min_response_delay_secs),
            max_response_delay_secs: Set(input.max_response_delay_secs),
            created_at: Set(Utc::now().into()),
        };
        self.bot_repo.create_group(model).await
    }

    /// Create or replace a bot's own config.
    pub async fn upsert_config(
        &self,
        bot_id: &str,
        input: UpsertBotConfigInput,
    ) -> AppResult<bot_config::Model> {
        input.validate()?;
        let active_hours = hours_json(input.active_hours.as_deref())?;

        let bot = self.user_repo.get_by_id(bot_id).await?;
        if !bot.is_bot {
            return Err(AppError::BadRequest(format!("User {bot_id} is not a bot")));
        }
        if let Some(group_id) = input.group_id.as_deref() {
            if self.bot_repo.find_group(group_id).await?.is_none() {
                return Err(AppError::NotFound(format!("Bot group {group_id} not found")));
            }
        }

        let existing = self.bot_repo.find_config(bot_id).await?;
        let mut active = bot_config::ActiveModel {
            user_id: Set(bot_id.to_string()),
            personality_prompt: Set(input.personality_prompt),
            tone: Set(input.tone),
            auto_like_rate: Set(input.auto_like_rate),
            cooldown_hours: Set(input.cooldown_hours),
            active_hours: Set(active_hours),
            use_global: Set(input.use_global),
            is_active: Set(input.is_active),
            group_id: Set(input.group_id),
            updated_at: Set(Some(Utc::now().into())),
        };

        if existing.is_some() {
            active.user_id = sea_orm::Unchanged(bot_id.to_string());
            self.bot_repo.update_config(active).await
        } else {
            self.bot_repo.create_config(active).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use amora_db::repositories::user::fixtures;
    use amora_db::entities::user;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn global(rate: i32, cooldown: i32) -> GlobalBotSettings {
        GlobalBotSettings {
            auto_like_rate: rate,
            cooldown_hours: cooldown,
            ..GlobalBotSettings::default()
        }
    }

    fn layer(rate: Option<i32>, cooldown: Option<i32>) -> SettingsLayer {
        SettingsLayer {
            auto_like_rate: rate,
            cooldown_hours: cooldown,
            active_hours: None,
        }
    }

    fn overrides(use_global: bool, layer: SettingsLayer) -> BotOverrides {
        BotOverrides {
            use_global,
            is_active: true,
            group_id: Some("g1".to_string()),
            layer,
        }
    }

    #[test]
    fn test_own_cooldown_wins_when_not_using_global() {
        let g = global(5, 72);
        let group = layer(Some(20), Some(12));
        let own = overrides(false, layer(None, Some(6)));

        let effective = resolve_effective(Some(&g), Some(&group), Some(&own));
        assert_eq!(effective.cooldown_hours, 6);
        // Unset own field falls back to global, not the group
        assert_eq!(effective.auto_like_rate, 5);
    }

    #[test]
    fn test_group_applies_when_using_global() {
        let g = global(5, 72);
        let group = layer(Some(20), None);
        let own = overrides(true, layer(Some(90), Some(1)));

        let effective = resolve_effective(Some(&g), Some(&group), Some(&own));
        assert_eq!(effective.auto_like_rate, 20);
        assert_eq!(effective.cooldown_hours, 72);
    }

    #[test]
    fn test_no_config_uses_global() {
        let g = global(40, 10);
        let effective = resolve_effective(Some(&g), None, None);
        assert_eq!(effective.auto_like_rate, 40);
        assert_eq!(effective.cooldown_hours, 10);
    }

    #[test]
    fn test_missing_global_uses_defaults() {
        let effective = resolve_effective(None, None, None);
        assert_eq!(effective.auto_like_rate, DEFAULT_AUTO_LIKE_RATE);
        assert_eq!(effective.cooldown_hours, DEFAULT_COOLDOWN_HOURS);
        assert!(effective.active_hours.is_unrestricted());
    }

    #[test]
    fn test_active_hours() {
        let empty = ActiveHours::default();
        assert!((0..24).all(|h| empty.allows(h)));

        let evening = ActiveHours::from_json(&json!([18, 19, 20])).unwrap();
        assert!(evening.allows(19));
        assert!(!evening.allows(9));

        assert!(ActiveHours::from_json(&json!([24])).is_err());
        assert!(ActiveHours::from_json(&json!(["9"])).is_err());
        assert!(ActiveHours::from_json(&json!({"from": 9})).is_err());
    }

    #[test]
    fn test_malformed_stored_hours_fall_through() {
        let group = bot_group::Model {
            id: "g1".to_string(),
            name: "night owls".to_string(),
            auto_like_rate: None,
            cooldown_hours: None,
            active_hours: Some(json!("late")),
            min_response_delay_secs: None,
            max_response_delay_secs: None,
            created_at: Utc::now().into(),
        };
        assert_eq!(SettingsLayer::from(&group).active_hours, None);
    }

    #[tokio::test]
    async fn test_update_global_rejects_out_of_range_rate() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = BotSettingsService::new(
            BotRepository::new(db.clone()),
            UserRepository::new(db),
        );

        let result = service
            .update_global(UpdateGlobalSettingsInput {
                auto_like_rate: Some(101),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = service
            .update_global(UpdateGlobalSettingsInput {
                active_hours: Some(vec![7, 25]),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upsert_config_requires_bot() {
        let member: user::Model = fixtures::member("user1", 0);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[member]])
                .into_connection(),
        );
        let service = BotSettingsService::new(
            BotRepository::new(db.clone()),
            UserRepository::new(db),
        );

        let result = service
            .upsert_config(
                "user1",
                UpsertBotConfigInput {
                    personality_prompt: None,
                    tone: None,
                    auto_like_rate: Some(10),
                    cooldown_hours: None,
                    active_hours: None,
                    use_global: false,
                    is_active: true,
                    group_id: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_effective_for_bot_without_config() {
        let row = bot_global_settings::Model {
            id: BOT_GLOBAL_SETTINGS_ID.to_string(),
            auto_like_enabled: true,
            auto_like_rate: 30,
            cooldown_hours: 24,
            active_hours: json!([]),
            auto_story: false,
            profile_rotation_minutes: 0,
            updated_at: None,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row]])
                .append_query_results([Vec::<bot_config::Model>::new()])
                .into_connection(),
        );
        let service = BotSettingsService::new(
            BotRepository::new(db.clone()),
            UserRepository::new(db),
        );

        let effective = service.effective_for("bot1").await.unwrap();
        assert_eq!(effective.auto_like_rate, 30);
        assert_eq!(effective.cooldown_hours, 24);
    }
}
