//! Profile like repository.

use std::sync::Arc;

use crate::entities::{ProfileLike, profile_like};
use amora_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, sea_query::OnConflict,
};

/// Profile like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a like unless the pair already has one.
    ///
    /// Returns `false` when a like for the same liker and liked profile was
    /// already stored, including one written concurrently.
    pub async fn create_if_absent(&self, model: profile_like::ActiveModel) -> AppResult<bool> {
        let rows = ProfileLike::insert(model)
            .on_conflict(
                OnConflict::columns([profile_like::Column::LikerId, profile_like::Column::LikedId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows == 1)
    }

    /// Which of `liker_ids` have already liked `liked_id`.
    pub async fn find_likers_of(
        &self,
        liker_ids: &[String],
        liked_id: &str,
    ) -> AppResult<Vec<String>> {
        if liker_ids.is_empty() {
            return Ok(vec![]);
        }

        ProfileLike::find()
            .filter(profile_like::Column::LikedId.eq(liked_id))
            .filter(profile_like::Column::LikerId.is_in(liker_ids.to_vec()))
            .select_only()
            .column(profile_like::Column::LikerId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
