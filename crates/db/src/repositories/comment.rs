//! Comment repository.

use std::sync::Arc;

use crate::entities::{Comment, comment};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, SqlErr,
};

use crate::entities::comment::ModerationStatus;

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound(id.to_string()))
    }

    /// Create a new comment. The synthetic reaction comment's partial
    /// uniqueness surfaces as `Conflict`.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment. Replies go with it via FK cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let comment = self.find_by_id(id).await?;
        if let Some(c) = comment {
            c.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get top-level comments on a post, pinned first then newest first.
    /// `visible_only` restricts to moderation-approved rows.
    pub async fn find_roots_by_post(
        &self,
        post_id: &str,
        visible_only: bool,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::ParentId.is_null())
            .order_by_desc(comment::Column::Pinned)
            .order_by_desc(comment::Column::Id);

        if visible_only {
            query = query.filter(comment::Column::Status.eq(ModerationStatus::Visible));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get replies to a comment, newest first.
    pub async fn find_replies(
        &self,
        parent_id: &str,
        visible_only: bool,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find()
            .filter(comment::Column::ParentId.eq(parent_id))
            .order_by_desc(comment::Column::Id);

        if visible_only {
            query = query.filter(comment::Column::Status.eq(ModerationStatus::Visible));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the synthetic reaction comment for a (post, author) pair.
    pub async fn find_reaction_comment(
        &self,
        post_id: &str,
        author_id: &str,
    ) -> AppResult<Option<comment::Model>> {
        Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::AuthorId.eq(author_id))
            .filter(comment::Column::IsReaction.eq(true))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the synthetic reaction comment for a (post, author) pair.
    pub async fn delete_reaction_comment(
        &self,
        post_id: &str,
        author_id: &str,
    ) -> AppResult<u64> {
        let result = Comment::delete_many()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::AuthorId.eq(author_id))
            .filter(comment::Column::IsReaction.eq(true))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_comment(id: &str, post_id: &str, author_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author_id: Some(author_id.to_string()),
            text: "Nice write-up".to_string(),
            status: ModerationStatus::Visible,
            parent_id: None,
            pinned: false,
            is_reaction: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.get_by_id("missing").await;

        match result {
            Err(AppError::CommentNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected CommentNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_roots_by_post() {
        let c1 = create_test_comment("c1", "p1", "user1");
        let c2 = create_test_comment("c2", "p1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_roots_by_post("p1", true).await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_reaction_comment() {
        let mut synthetic = create_test_comment("c9", "p1", "user1");
        synthetic.is_reaction = true;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[synthetic]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_reaction_comment("p1", "user1").await.unwrap();

        assert!(result.unwrap().is_reaction);
    }

    #[tokio::test]
    async fn test_delete_reaction_comment_reports_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let deleted = repo.delete_reaction_comment("p1", "user1").await.unwrap();

        assert_eq!(deleted, 1);
    }
}
