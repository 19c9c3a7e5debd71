//! Subscription repository.

use std::sync::Arc;

use crate::entities::{Subscription, subscription};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    SqlErr,
};

/// Subscription repository for database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's subscription to an author.
    pub async fn find_by_author_pair(
        &self,
        user_id: &str,
        author_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::AuthorId.eq(author_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user's subscription to a tag.
    pub async fn find_by_tag_pair(
        &self,
        user_id: &str,
        tag_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::TagId.eq(tag_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a subscription. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(&self, model: subscription::ActiveModel) -> AppResult<subscription::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a user's subscription to an author.
    pub async fn delete_by_author_pair(&self, user_id: &str, author_id: &str) -> AppResult<u64> {
        let result = Subscription::delete_many()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete a user's subscription to a tag.
    pub async fn delete_by_tag_pair(&self, user_id: &str, tag_id: &str) -> AppResult<u64> {
        let result = Subscription::delete_many()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::TagId.eq(tag_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Get all subscriptions held by a user, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .order_by_desc(subscription::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn author_subscription(id: &str, user_id: &str, author_id: &str) -> subscription::Model {
        subscription::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            author_id: Some(author_id.to_string()),
            tag_id: None,
            created_at: Utc::now().into(),
        }
    }

    fn tag_subscription(id: &str, user_id: &str, tag_id: &str) -> subscription::Model {
        subscription::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            author_id: None,
            tag_id: Some(tag_id.to_string()),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_author_pair() {
        let sub = author_subscription("s1", "user1", "author1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[sub.clone()]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        let result = repo.find_by_author_pair("user1", "author1").await.unwrap();

        assert_eq!(result.unwrap().author_id, Some("author1".to_string()));
    }

    #[tokio::test]
    async fn test_find_by_user_mixed_targets() {
        let s1 = author_subscription("s1", "user1", "author1");
        let s2 = tag_subscription("s2", "user1", "tag1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[s1, s2]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        let result = repo.find_by_user("user1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result[0].author_id.is_some());
        assert!(result[1].tag_id.is_some());
    }
}
