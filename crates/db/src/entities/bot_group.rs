//! Named bot cohorts sharing behavior defaults.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bot_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    /// Like probability in percent (0-100)
    #[sea_orm(nullable)]
    pub auto_like_rate: Option<i32>,

    #[sea_orm(nullable)]
    pub cooldown_hours: Option<i32>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub active_hours: Option<Json>,

    /// Lower bound of the simulated reply delay
    #[sea_orm(nullable)]
    pub min_response_delay_secs: Option<i32>,

    /// Upper bound of the simulated reply delay
    #[sea_orm(nullable)]
    pub max_response_delay_secs: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bot_config::Entity")]
    BotConfig,
}

impl Related<super::bot_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BotConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
