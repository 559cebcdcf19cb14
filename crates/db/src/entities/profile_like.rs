//! Profile like entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile_like")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who liked
    pub liker_id: String,

    /// The user being liked
    pub liked_id: String,

    /// Sent by the bot automation rather than a person
    #[sea_orm(default_value = false)]
    pub is_automated: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::LikerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Liker,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::LikedId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Liked,
}

impl ActiveModelBehavior for ActiveModel {}
