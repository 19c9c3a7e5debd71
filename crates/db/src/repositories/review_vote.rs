//! Review vote repository.

use std::sync::Arc;

use crate::entities::{ReviewVote, review_vote};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    SqlErr,
};

use crate::entities::review_vote::ReviewVoteKind;

/// Review vote repository for database operations.
#[derive(Clone)]
pub struct ReviewVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl ReviewVoteRepository {
    /// Create a new review vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a vote by (review, user) pair.
    pub async fn find_by_pair(
        &self,
        review_id: &str,
        user_id: &str,
    ) -> AppResult<Option<review_vote::Model>> {
        ReviewVote::find()
            .filter(review_vote::Column::ReviewId.eq(review_id))
            .filter(review_vote::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a vote. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(&self, model: review_vote::ActiveModel) -> AppResult<review_vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a vote.
    pub async fn update(&self, model: review_vote::ActiveModel) -> AppResult<review_vote::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a vote by (review, user) pair.
    pub async fn delete_by_pair(&self, review_id: &str, user_id: &str) -> AppResult<u64> {
        let result = ReviewVote::delete_many()
            .filter(review_vote::Column::ReviewId.eq(review_id))
            .filter(review_vote::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count likes or dislikes on a review.
    pub async fn count_by_vote(&self, review_id: &str, vote: ReviewVoteKind) -> AppResult<u64> {
        ReviewVote::find()
            .filter(review_vote::Column::ReviewId.eq(review_id))
            .filter(review_vote::Column::Vote.eq(vote))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
