//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post, post_tag};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
    sea_query::{Expr, Query, extension::postgres::PgExpr},
};

use crate::entities::post::PostStatus;

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find a post by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a slug is already taken.
    pub async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        Ok(self.find_by_slug(slug).await?.is_some())
    }

    /// Check whether a slug is taken by any post other than `exclude_id`.
    pub async fn slug_exists_excluding(&self, slug: &str, exclude_id: &str) -> AppResult<bool> {
        let found = Post::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Id.ne(exclude_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.is_some())
    }

    /// Create a new post. Slug collisions surface as `Conflict`.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model.update(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a post. Children go with it via FK cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let post = self.find_by_id(id).await?;
        if let Some(p) = post {
            p.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get published, visible posts (paginated, newest first).
    pub async fn list_published(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(post::Column::IsVisible.eq(true))
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Free-text search over title and content (published, visible posts).
    pub async fn search(
        &self,
        query_text: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let pattern = format!(
            "%{}%",
            query_text.replace('%', "\\%").replace('_', "\\_")
        );

        let mut query = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(post::Column::IsVisible.eq(true))
            .filter(
                Condition::any()
                    .add(Expr::col(post::Column::Title).ilike(pattern.as_str()))
                    .add(Expr::col(post::Column::Content).ilike(pattern.as_str())),
            )
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get published, visible posts carrying a tag (paginated).
    pub async fn find_by_tag(
        &self,
        tag_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(post::Column::IsVisible.eq(true))
            .filter(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(post_tag::Column::PostId)
                        .from(post_tag::Entity)
                        .and_where(post_tag::Column::TagId.eq(tag_id))
                        .to_owned(),
                ),
            )
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get published, visible posts for a platform (paginated).
    pub async fn find_by_platform(
        &self,
        platform: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(post::Column::IsVisible.eq(true))
            .filter(post::Column::Platform.eq(platform))
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get posts by an author (paginated). Drafts and hidden posts are
    /// included only when `include_unpublished` is set.
    pub async fn find_by_author(
        &self,
        author_id: &str,
        include_unpublished: bool,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::Id);

        if !include_unpublished {
            query = query
                .filter(post::Column::Status.eq(PostStatus::Published))
                .filter(post::Column::IsVisible.eq(true));
        }

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get published, visible posts by any followed author or carrying any
    /// followed tag (the personalized feed, newest first). The OR over a
    /// single table scan dedups posts matched both ways.
    pub async fn find_feed(
        &self,
        author_ids: &[String],
        tag_ids: &[String],
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        if author_ids.is_empty() && tag_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut targets = Condition::any();
        if !author_ids.is_empty() {
            targets = targets.add(post::Column::AuthorId.is_in(author_ids.to_vec()));
        }
        if !tag_ids.is_empty() {
            targets = targets.add(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(post_tag::Column::PostId)
                        .from(post_tag::Entity)
                        .and_where(post_tag::Column::TagId.is_in(tag_ids.to_vec()))
                        .to_owned(),
                ),
            );
        }

        let mut query = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(post::Column::IsVisible.eq(true))
            .filter(targets)
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
