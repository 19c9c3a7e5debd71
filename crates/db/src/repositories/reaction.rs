//! Reaction repository.

use std::sync::Arc;

use crate::entities::{Reaction, reaction};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr,
};

use crate::entities::reaction::ReactionKind;

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reaction by (post, user) pair. At most one exists.
    pub async fn find_by_post_and_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a reaction. A lost create race surfaces as `Conflict`.
    pub async fn create(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a reaction (kind change stays in place).
    pub async fn update(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a reaction by (post, user) pair.
    pub async fn delete_by_post_and_user(&self, post_id: &str, user_id: &str) -> AppResult<u64> {
        let result = Reaction::delete_many()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count reactions of one kind on a post.
    pub async fn count_by_kind(&self, post_id: &str, kind: ReactionKind) -> AppResult<u64> {
        Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::Kind.eq(kind))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get reactions of one kind on a post, newest first.
    pub async fn find_by_post_and_kind(
        &self,
        post_id: &str,
        kind: ReactionKind,
    ) -> AppResult<Vec<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::Kind.eq(kind))
            .order_by_desc(reaction::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
