//! Per-bot behavior overrides.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bot_config")]
pub struct Model {
    /// The bot profile this config belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub personality_prompt: Option<String>,

    #[sea_orm(nullable)]
    pub tone: Option<String>,

    /// Like probability in percent (0-100)
    #[sea_orm(nullable)]
    pub auto_like_rate: Option<i32>,

    #[sea_orm(nullable)]
    pub cooldown_hours: Option<i32>,

    /// UTC hours (0-23) the bot may act in; empty means any hour
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub active_hours: Option<Json>,

    /// When false, this row's own fields take precedence over the group
    #[sea_orm(default_value = true)]
    pub use_global: bool,

    /// Explicit kill switch for this bot's automation
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(nullable)]
    pub group_id: Option<String>,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::bot_group::Entity",
        from = "Column::GroupId",
        to = "super::bot_group::Column::Id",
        on_delete = "SetNull"
    )]
    Group,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::bot_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
