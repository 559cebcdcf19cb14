//! Thresholds for automatic moderation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Singleton ID for the moderation settings row.
pub const MODERATION_SETTINGS_ID: &str = "moderation";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(default_value = true)]
    pub auto_moderation_enabled: bool,

    /// Pending reports at which a profile is hidden from discovery
    #[sea_orm(default_value = 3)]
    pub max_reports_before_hide: i32,

    /// Pending reports at which a user is banned
    #[sea_orm(default_value = 7)]
    pub max_reports_before_ban: i32,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
