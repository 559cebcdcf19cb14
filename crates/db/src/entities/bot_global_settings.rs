//! Singleton fallback settings for all bots.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Singleton ID for the global bot settings row.
pub const BOT_GLOBAL_SETTINGS_ID: &str = "global";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bot_global_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Master switch for the auto-like loop
    #[sea_orm(default_value = true)]
    pub auto_like_enabled: bool,

    /// Like probability in percent (0-100)
    #[sea_orm(default_value = 5)]
    pub auto_like_rate: i32,

    #[sea_orm(default_value = 72)]
    pub cooldown_hours: i32,

    #[sea_orm(column_type = "JsonBinary")]
    pub active_hours: Json,

    /// Whether bots post stories automatically
    #[sea_orm(default_value = false)]
    pub auto_story: bool,

    /// How often bot photo sets rotate
    #[sea_orm(default_value = 0)]
    pub profile_rotation_minutes: i32,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
