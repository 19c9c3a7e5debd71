//! Review repository.

use std::sync::Arc;

use crate::entities::{Review, review};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};

use crate::entities::comment::ModerationStatus;

/// Review repository for database operations.
#[derive(Clone)]
pub struct ReviewRepository {
    db: Arc<DatabaseConnection>,
}

impl ReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a review by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<review::Model>> {
        Review::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a review by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<review::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ReviewNotFound(id.to_string()))
    }

    /// Find a user's root review on a post. At most one exists.
    pub async fn find_root_by_post_and_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<review::Model>> {
        Review::find()
            .filter(review::Column::PostId.eq(post_id))
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::ParentId.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a review. A lost root-upsert race surfaces as `Conflict`.
    pub async fn create(&self, model: review::ActiveModel) -> AppResult<review::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a review.
    pub async fn update(&self, model: review::ActiveModel) -> AppResult<review::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a review. Replies go with it via FK cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let review = self.find_by_id(id).await?;
        if let Some(r) = review {
            r.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get root reviews on a post, pinned first then newest first.
    /// `visible_only` restricts to moderation-approved rows.
    pub async fn find_roots_by_post(
        &self,
        post_id: &str,
        visible_only: bool,
    ) -> AppResult<Vec<review::Model>> {
        let mut query = Review::find()
            .filter(review::Column::PostId.eq(post_id))
            .filter(review::Column::ParentId.is_null())
            .order_by_desc(review::Column::Pinned)
            .order_by_desc(review::Column::Id);

        if visible_only {
            query = query.filter(review::Column::Status.eq(ModerationStatus::Visible));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get replies to a review, newest first.
    pub async fn find_replies(
        &self,
        parent_id: &str,
        visible_only: bool,
    ) -> AppResult<Vec<review::Model>> {
        let mut query = Review::find()
            .filter(review::Column::ParentId.eq(parent_id))
            .order_by_desc(review::Column::Id);

        if visible_only {
            query = query.filter(review::Column::Status.eq(ModerationStatus::Visible));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the non-null ratings on a post, for the aggregate average.
    pub async fn find_ratings(&self, post_id: &str) -> AppResult<Vec<i16>> {
        Review::find()
            .filter(review::Column::PostId.eq(post_id))
            .filter(review::Column::Rating.is_not_null())
            .select_only()
            .column(review::Column::Rating)
            .into_tuple::<i16>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all review rows on a post, replies included.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Review::find()
            .filter(review::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
