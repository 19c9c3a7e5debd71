//! Post block repository.

use std::sync::Arc;

use crate::entities::{PostBlock, post_block};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
};

/// Post block repository for database operations.
#[derive(Clone)]
pub struct PostBlockRepository {
    db: Arc<DatabaseConnection>,
}

impl PostBlockRepository {
    /// Create a new post block repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a block by (post, user) pair.
    pub async fn find_by_pair(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<post_block::Model>> {
        PostBlock::find()
            .filter(post_block::Column::PostId.eq(post_id))
            .filter(post_block::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a user is barred from interacting with a post.
    pub async fn is_blocked(&self, post_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(post_id, user_id).await?.is_some())
    }

    /// Create a block. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(&self, model: post_block::ActiveModel) -> AppResult<post_block::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a block by (post, user) pair.
    pub async fn delete_by_pair(&self, post_id: &str, user_id: &str) -> AppResult<u64> {
        let result = PostBlock::delete_many()
            .filter(post_block::Column::PostId.eq(post_id))
            .filter(post_block::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
