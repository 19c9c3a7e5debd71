//! Subscription and personalized-feed service.

use chrono::Utc;
use gazette_common::{AppError, AppResult, IdGenerator};
use gazette_db::{
    entities::{post, subscription, tag, user},
    repositories::{PostRepository, SubscriptionRepository, TagRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;

/// Result of a subscription toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    /// Whether the subscription exists after the toggle.
    pub subscribed: bool,
}

/// A user's followed authors and tags, resolved to their rows.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionLists {
    pub authors: Vec<user::Model>,
    pub tags: Vec<tag::Model>,
}

/// Subscription service for business logic.
///
/// Subscriptions target exactly one of an author or a tag; subscribing is a
/// strict toggle, so a second identical call removes the row. The feed is
/// computed at read time from the follow sets, never materialized.
#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repo: SubscriptionRepository,
    post_repo: PostRepository,
    tag_repo: TagRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub const fn new(
        subscription_repo: SubscriptionRepository,
        post_repo: PostRepository,
        tag_repo: TagRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            subscription_repo,
            post_repo,
            tag_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Toggle a subscription to an author.
    pub async fn toggle_author(&self, user_id: &str, author_id: &str) -> AppResult<ToggleOutcome> {
        // Cannot follow yourself
        if user_id == author_id {
            return Err(AppError::BadRequest(
                "Cannot subscribe to yourself".to_string(),
            ));
        }

        // Check if target exists
        let author = self.user_repo.get_by_id(author_id).await?;

        if self
            .subscription_repo
            .find_by_author_pair(user_id, &author.id)
            .await?
            .is_some()
        {
            self.subscription_repo
                .delete_by_author_pair(user_id, &author.id)
                .await?;
            return Ok(ToggleOutcome { subscribed: false });
        }

        let model = subscription::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            author_id: Set(Some(author.id.clone())),
            tag_id: Set(None),
            created_at: Set(Utc::now().into()),
        };

        match self.subscription_repo.create(model).await {
            Ok(_) => Ok(ToggleOutcome { subscribed: true }),
            // A concurrent toggle inserted first; complete this call as the
            // un-subscribe half of the pair.
            Err(AppError::Conflict(_)) => {
                self.subscription_repo
                    .delete_by_author_pair(user_id, &author.id)
                    .await?;
                Ok(ToggleOutcome { subscribed: false })
            }
            Err(e) => Err(e),
        }
    }

    /// Toggle a subscription to a tag, addressed by slug.
    pub async fn toggle_tag(&self, user_id: &str, tag_slug: &str) -> AppResult<ToggleOutcome> {
        let tag = self
            .tag_repo
            .find_by_slug(tag_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag not found: {tag_slug}")))?;

        if self
            .subscription_repo
            .find_by_tag_pair(user_id, &tag.id)
            .await?
            .is_some()
        {
            self.subscription_repo
                .delete_by_tag_pair(user_id, &tag.id)
                .await?;
            return Ok(ToggleOutcome { subscribed: false });
        }

        let model = subscription::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            author_id: Set(None),
            tag_id: Set(Some(tag.id.clone())),
            created_at: Set(Utc::now().into()),
        };

        match self.subscription_repo.create(model).await {
            Ok(_) => Ok(ToggleOutcome { subscribed: true }),
            Err(AppError::Conflict(_)) => {
                self.subscription_repo
                    .delete_by_tag_pair(user_id, &tag.id)
                    .await?;
                Ok(ToggleOutcome { subscribed: false })
            }
            Err(e) => Err(e),
        }
    }

    /// Get a user's subscriptions, split by target kind.
    pub async fn subscriptions(&self, user_id: &str) -> AppResult<SubscriptionLists> {
        let subs = self.subscription_repo.find_by_user(user_id).await?;

        let (author_ids, tag_ids) = Self::split_targets(&subs);

        let authors = if author_ids.is_empty() {
            vec![]
        } else {
            self.user_repo.find_by_ids(&author_ids).await?
        };
        let tags = if tag_ids.is_empty() {
            vec![]
        } else {
            self.tag_repo.find_by_ids(&tag_ids).await?
        };

        Ok(SubscriptionLists { authors, tags })
    }

    /// Get the personalized feed: published posts by any followed author or
    /// carrying any followed tag, newest first.
    pub async fn personal_feed(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let subs = self.subscription_repo.find_by_user(user_id).await?;

        let (author_ids, tag_ids) = Self::split_targets(&subs);

        self.post_repo
            .find_feed(&author_ids, &tag_ids, limit, until_id)
            .await
    }

    fn split_targets(subs: &[subscription::Model]) -> (Vec<String>, Vec<String>) {
        let author_ids: Vec<String> = subs.iter().filter_map(|s| s.author_id.clone()).collect();
        let tag_ids: Vec<String> = subs.iter().filter_map(|s| s.tag_id.clone()).collect();
        (author_ids, tag_ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gazette_db::entities::post::PostStatus;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            display_name: None,
            is_staff: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_tag(id: &str, slug: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_post(id: &str, slug: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            title: "Test Post".to_string(),
            slug: slug.to_string(),
            author_id: author_id.to_string(),
            excerpt: None,
            content: "Body text".to_string(),
            status: PostStatus::Published,
            platform: None,
            is_visible: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

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

    fn service(
        sub_db: Arc<sea_orm::DatabaseConnection>,
        post_db: Arc<sea_orm::DatabaseConnection>,
        tag_db: Arc<sea_orm::DatabaseConnection>,
        user_db: Arc<sea_orm::DatabaseConnection>,
    ) -> SubscriptionService {
        SubscriptionService::new(
            SubscriptionRepository::new(sub_db),
            PostRepository::new(post_db),
            TagRepository::new(tag_db),
            UserRepository::new(user_db),
        )
    }

    fn empty_conn() -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    #[tokio::test]
    async fn test_toggle_author_self_rejected() {
        let service = service(empty_conn(), empty_conn(), empty_conn(), empty_conn());

        let result = service.toggle_author("user1", "user1").await;
        match result {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("yourself")),
            _ => panic!("Expected BadRequest error"),
        }
    }

    #[tokio::test]
    async fn test_toggle_author_unknown_author_rejected() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = service(empty_conn(), empty_conn(), empty_conn(), user_db);

        let result = service.toggle_author("user1", "ghost").await;
        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "ghost"),
            _ => panic!("Expected UserNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_toggle_author_creates_subscription() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    Vec::<subscription::Model>::new(),
                    vec![author_subscription("s1", "user1", "author1")],
                ])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("author1", "alice")]])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), empty_conn(), user_db);

        let outcome = service.toggle_author("user1", "author1").await.unwrap();
        assert!(outcome.subscribed);
    }

    #[tokio::test]
    async fn test_toggle_author_removes_existing_subscription() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[author_subscription("s1", "user1", "author1")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("author1", "alice")]])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), empty_conn(), user_db);

        let outcome = service.toggle_author("user1", "author1").await.unwrap();
        assert!(!outcome.subscribed);
    }

    #[tokio::test]
    async fn test_toggle_tag_unknown_slug_rejected() {
        let tag_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()])
                .into_connection(),
        );

        let service = service(empty_conn(), empty_conn(), tag_db, empty_conn());

        let result = service.toggle_tag("user1", "missing").await;
        match result {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("missing")),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_toggle_tag_creates_subscription() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    Vec::<subscription::Model>::new(),
                    vec![tag_subscription("s1", "user1", "tag1")],
                ])
                .into_connection(),
        );
        let tag_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("tag1", "rpg")]])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), tag_db, empty_conn());

        let outcome = service.toggle_tag("user1", "rpg").await.unwrap();
        assert!(outcome.subscribed);
    }

    #[tokio::test]
    async fn test_toggle_tag_removes_existing_subscription() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[tag_subscription("s1", "user1", "tag1")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let tag_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("tag1", "rpg")]])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), tag_db, empty_conn());

        let outcome = service.toggle_tag("user1", "rpg").await.unwrap();
        assert!(!outcome.subscribed);
    }

    #[tokio::test]
    async fn test_subscriptions_split_by_target() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    author_subscription("s1", "user1", "author1"),
                    tag_subscription("s2", "user1", "tag1"),
                ]])
                .into_connection(),
        );
        let tag_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("tag1", "rpg")]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("author1", "alice")]])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), tag_db, user_db);

        let lists = service.subscriptions("user1").await.unwrap();
        assert_eq!(lists.authors.len(), 1);
        assert_eq!(lists.authors[0].username, "alice");
        assert_eq!(lists.tags.len(), 1);
        assert_eq!(lists.tags[0].slug, "rpg");
    }

    #[tokio::test]
    async fn test_subscriptions_empty_skips_lookups() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<subscription::Model>::new()])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), empty_conn(), empty_conn());

        let lists = service.subscriptions("user1").await.unwrap();
        assert!(lists.authors.is_empty());
        assert!(lists.tags.is_empty());
    }

    #[tokio::test]
    async fn test_personal_feed_returns_followed_posts() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    author_subscription("s1", "user1", "author1"),
                    tag_subscription("s2", "user1", "tag1"),
                ]])
                .into_connection(),
        );
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "one", "author1")]])
                .into_connection(),
        );

        let service = service(sub_db, post_db, empty_conn(), empty_conn());

        let feed = service.personal_feed("user1", 10, None).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author_id, "author1");
    }

    #[tokio::test]
    async fn test_personal_feed_no_subscriptions_is_empty() {
        let sub_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<subscription::Model>::new()])
                .into_connection(),
        );

        let service = service(sub_db, empty_conn(), empty_conn(), empty_conn());

        let feed = service.personal_feed("user1", 10, None).await.unwrap();
        assert!(feed.is_empty());
    }
}
