//! User entity (real members and bot profiles).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[derive(Default)]
pub enum UserRole {
    #[sea_orm(string_value = "user")]
    #[default]
    User,
    #[sea_orm(string_value = "moderator")]
    Moderator,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    /// Whether this role may run moderation actions.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Display name
    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    /// Self-declared gender
    #[sea_orm(nullable)]
    pub gender: Option<String>,

    /// Is this profile driven by automation?
    #[sea_orm(default_value = false)]
    pub is_bot: bool,

    /// Bearer token issued by the auth provider
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    pub role: UserRole,

    /// Virtual currency balance
    #[sea_orm(default_value = 0)]
    pub coin_balance: i64,

    #[sea_orm(default_value = false)]
    pub is_premium: bool,

    /// Code other users enter to credit this user
    #[sea_orm(unique)]
    pub referral_code: String,

    /// User whose code this user applied
    #[sea_orm(nullable)]
    pub referred_by: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_banned: bool,

    /// Hidden from discovery
    #[sea_orm(default_value = false)]
    pub is_hidden: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::bot_config::Entity")]
    BotConfig,
    #[sea_orm(has_many = "super::coin_transaction::Entity")]
    CoinTransaction,
    #[sea_orm(has_many = "super::access_unlock::Entity")]
    AccessUnlock,
}

impl Related<super::bot_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BotConfig.def()
    }
}

impl Related<super::coin_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CoinTransaction.def()
    }
}

impl Related<super::access_unlock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessUnlock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
