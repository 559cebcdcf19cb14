//! Audit log entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Acting user; None for automated actions
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    /// Action name (e.g. "user.auto_ban")
    pub action: String,

    #[sea_orm(nullable)]
    pub target_id: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub details: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
