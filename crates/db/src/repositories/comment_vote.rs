//! Comment vote repository.

use std::sync::Arc;

use crate::entities::{CommentVote, comment_vote};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    SqlErr,
};

/// Comment vote repository for database operations.
#[derive(Clone)]
pub struct CommentVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentVoteRepository {
    /// Create a new comment vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a vote by (comment, user) pair.
    pub async fn find_by_pair(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> AppResult<Option<comment_vote::Model>> {
        CommentVote::find()
            .filter(comment_vote::Column::CommentId.eq(comment_id))
            .filter(comment_vote::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a vote. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(&self, model: comment_vote::ActiveModel) -> AppResult<comment_vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a vote.
    pub async fn update(&self, model: comment_vote::ActiveModel) -> AppResult<comment_vote::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a vote by (comment, user) pair.
    pub async fn delete_by_pair(&self, comment_id: &str, user_id: &str) -> AppResult<u64> {
        let result = CommentVote::delete_many()
            .filter(comment_vote::Column::CommentId.eq(comment_id))
            .filter(comment_vote::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count votes with a given value on a comment.
    pub async fn count_by_value(&self, comment_id: &str, value: i16) -> AppResult<u64> {
        CommentVote::find()
            .filter(comment_vote::Column::CommentId.eq(comment_id))
            .filter(comment_vote::Column::Value.eq(value))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_vote(id: &str, comment_id: &str, user_id: &str, value: i16) -> comment_vote::Model {
        comment_vote::Model {
            id: id.to_string(),
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            value,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair() {
        let vote = create_test_vote("v1", "c1", "user1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[vote.clone()]])
                .into_connection(),
        );

        let repo = CommentVoteRepository::new(db);
        let result = repo.find_by_pair("c1", "user1").await.unwrap();

        assert_eq!(result.unwrap().value, 1);
    }

    #[tokio::test]
    async fn test_find_by_pair_absent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment_vote::Model>::new()])
                .into_connection(),
        );

        let repo = CommentVoteRepository::new(db);
        let result = repo.find_by_pair("c1", "user1").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_count_by_value() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3)),
                }]])
                .into_connection(),
        );

        let repo = CommentVoteRepository::new(db);
        let count = repo.count_by_value("c1", 1).await.unwrap();

        assert_eq!(count, 3);
    }
}
