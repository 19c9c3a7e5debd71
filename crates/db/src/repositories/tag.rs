//! Tag repository.

use std::sync::Arc;

use crate::entities::{PostTag, Tag, post_tag, tag};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find tags by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<tag::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new tag. Duplicate names surface as `Conflict` so callers
    /// can re-fetch the winner of a find-or-create race.
    pub async fn create(&self, model: tag::ActiveModel) -> AppResult<tag::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Attach a tag to a post. Already-attached surfaces as `Conflict`.
    pub async fn attach(&self, model: post_tag::ActiveModel) -> AppResult<post_tag::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Remove every tag from a post.
    pub async fn clear_post(&self, post_id: &str) -> AppResult<u64> {
        let result = PostTag::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Get the tags attached to a post.
    pub async fn find_by_post(&self, post_id: &str) -> AppResult<Vec<tag::Model>> {
        let joins = PostTag::find()
            .filter(post_tag::Column::PostId.eq(post_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let tag_ids: Vec<String> = joins.into_iter().map(|j| j.tag_id).collect();
        self.find_by_ids(&tag_ids).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_tag(id: &str, name: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let tag = create_test_tag("t1", "rpg");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[tag.clone()]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.find_by_name("rpg").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().name, "rpg");
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_input() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }
}
