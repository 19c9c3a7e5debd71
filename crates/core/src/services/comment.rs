//! Comment service.

use std::sync::LazyLock;

use chrono::Utc;
use gazette_common::{AppError, AppResult, IdGenerator};
use gazette_db::{
    entities::{
        comment::{self, ModerationStatus},
        comment_vote, post,
    },
    repositories::{
        CommentRepository, CommentVoteRepository, PostBlockRepository, PostRepository,
        UserRepository,
    },
};
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::services::notification::NotificationService;

#[allow(clippy::unwrap_used)]
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").unwrap());

/// Direction of a comment vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// The stored vote value.
    #[must_use]
    pub const fn value(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    comment_vote_repo: CommentVoteRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    post_block_repo: PostBlockRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        comment_vote_repo: CommentVoteRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        post_block_repo: PostBlockRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            comment_vote_repo,
            post_repo,
            user_repo,
            post_block_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a comment on a post. Root comments await moderation; replies
    /// are visible immediately.
    pub async fn create(
        &self,
        actor_id: &str,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> AppResult<comment::Model> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Comment text is required".to_string()));
        }

        // Check if post exists
        let post = self.post_repo.get_by_id(post_id).await?;

        // Check if the author is banned from this post
        if self.post_block_repo.is_blocked(&post.id, actor_id).await? {
            return Err(AppError::Forbidden(
                "You are blocked from commenting on this post".to_string(),
            ));
        }

        // Unknown or cross-post parents are dropped; the comment lands as a root.
        let parent = match parent_id {
            Some(pid) => self
                .comment_repo
                .find_by_id(pid)
                .await?
                .filter(|p| p.post_id == post.id),
            None => None,
        };

        let status = if parent.is_some() {
            ModerationStatus::Visible
        } else {
            ModerationStatus::Pending
        };

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            author_id: Set(Some(actor_id.to_string())),
            text: Set(text.to_string()),
            status: Set(status),
            parent_id: Set(parent.as_ref().map(|p| p.id.clone())),
            pinned: Set(false),
            is_reaction: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let created = self.comment_repo.create(model).await?;

        // Notification fan-out is best-effort; the comment itself stands.
        if let Err(e) = self
            .fan_out(&post, &created, parent.as_ref(), actor_id, text)
            .await
        {
            tracing::warn!(
                error = %e,
                comment_id = %created.id,
                "Failed to fan out comment notifications"
            );
        }

        Ok(created)
    }

    async fn fan_out(
        &self,
        post: &post::Model,
        created: &comment::Model,
        parent: Option<&comment::Model>,
        actor_id: &str,
        text: &str,
    ) -> AppResult<()> {
        if let Some(parent) = parent {
            if let Some(recipient) = parent.author_id.as_deref() {
                self.notifications
                    .notify_comment_replied(recipient, actor_id, &post.id, &created.id)
                    .await?;
            }
        } else {
            self.notifications
                .notify_post_commented(&post.author_id, actor_id, &post.id, &created.id)
                .await?;
        }

        for username in extract_mentions(text) {
            if let Some(user) = self.user_repo.find_by_username(&username).await? {
                self.notifications
                    .notify_mentioned(&user.id, actor_id, &post.id, &created.id)
                    .await?;
            }
        }

        Ok(())
    }

    /// Vote on a comment. Repeating a vote removes it; the opposite
    /// direction overwrites it. Returns the resulting score.
    pub async fn vote(
        &self,
        actor_id: &str,
        comment_id: &str,
        direction: VoteDirection,
    ) -> AppResult<i64> {
        // Check if comment exists
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        let value = direction.value();
        let existing = self
            .comment_vote_repo
            .find_by_pair(&comment.id, actor_id)
            .await?;

        match existing {
            None => {
                let model = comment_vote::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    comment_id: Set(comment.id.clone()),
                    user_id: Set(actor_id.to_string()),
                    value: Set(value),
                    created_at: Set(Utc::now().into()),
                };

                match self.comment_vote_repo.create(model).await {
                    Ok(_) => {}
                    // A concurrent vote by the same user won; re-apply against it.
                    Err(AppError::Conflict(_)) => {
                        let vote = self
                            .comment_vote_repo
                            .find_by_pair(&comment.id, actor_id)
                            .await?
                            .ok_or_else(|| {
                                AppError::Conflict("Vote changed concurrently".to_string())
                            })?;

                        if vote.value == value {
                            self.comment_vote_repo
                                .delete_by_pair(&comment.id, actor_id)
                                .await?;
                        } else {
                            let mut active: comment_vote::ActiveModel = vote.into();
                            active.value = Set(value);
                            self.comment_vote_repo.update(active).await?;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(vote) if vote.value == value => {
                self.comment_vote_repo
                    .delete_by_pair(&comment.id, actor_id)
                    .await?;
            }
            Some(vote) => {
                let mut active: comment_vote::ActiveModel = vote.into();
                active.value = Set(value);
                self.comment_vote_repo.update(active).await?;
            }
        }

        self.score(&comment.id).await
    }

    /// Net score of a comment (upvotes minus downvotes).
    pub async fn score(&self, comment_id: &str) -> AppResult<i64> {
        let up = self.comment_vote_repo.count_by_value(comment_id, 1).await?;
        let down = self
            .comment_vote_repo
            .count_by_value(comment_id, -1)
            .await?;

        Ok(up as i64 - down as i64)
    }

    /// Pin or unpin a comment. Only the post author can pin.
    pub async fn set_pinned(
        &self,
        actor_id: &str,
        comment_id: &str,
        pinned: bool,
    ) -> AppResult<comment::Model> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        let post = self.post_repo.get_by_id(&comment.post_id).await?;

        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the post author can pin comments".to_string(),
            ));
        }

        let mut active: comment::ActiveModel = comment.into();
        active.pinned = Set(pinned);

        self.comment_repo.update(active).await
    }

    /// Get top-level comments on a post, pinned first then newest first.
    /// Rows held back by moderation stay visible to the post author and staff.
    pub async fn list_for_post(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let visible_only = !self.can_view_all(&post, viewer_id).await?;

        self.comment_repo
            .find_roots_by_post(&post.id, visible_only)
            .await
    }

    /// Get replies to a comment, newest first.
    pub async fn list_replies(
        &self,
        parent_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        let parent = self.comment_repo.get_by_id(parent_id).await?;
        let post = self.post_repo.get_by_id(&parent.post_id).await?;
        let visible_only = !self.can_view_all(&post, viewer_id).await?;

        self.comment_repo
            .find_replies(&parent.id, visible_only)
            .await
    }

    async fn can_view_all(&self, post: &post::Model, viewer_id: Option<&str>) -> AppResult<bool> {
        let Some(viewer) = viewer_id else {
            return Ok(false);
        };

        if viewer == post.author_id {
            return Ok(true);
        }

        Ok(self
            .user_repo
            .find_by_id(viewer)
            .await?
            .is_some_and(|u| u.is_staff))
    }
}

/// Extract unique @-mentioned usernames in order of first appearance.
fn extract_mentions(text: &str) -> Vec<String> {
    let mut handles: Vec<String> = Vec::new();

    for caps in MENTION_RE.captures_iter(text) {
        if let Some(handle) = caps.get(1) {
            let handle = handle.as_str();
            if !handles.iter().any(|h| h == handle) {
                handles.push(handle.to_string());
            }
        }
    }

    handles
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gazette_db::entities::{notification_block, post_block};
    use gazette_db::repositories::{NotificationBlockRepository, NotificationRepository};
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            author_id: author_id.to_string(),
            excerpt: None,
            content: "Body text".to_string(),
            status: post::PostStatus::Published,
            platform: None,
            is_visible: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

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

    fn create_test_vote(comment_id: &str, user_id: &str, value: i16) -> comment_vote::Model {
        comment_vote::Model {
            id: "vote1".to_string(),
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            value,
            created_at: Utc::now().into(),
        }
    }

    fn build_service(
        comment_db: MockDatabase,
        vote_db: MockDatabase,
        post_db: MockDatabase,
        user_db: MockDatabase,
        block_db: MockDatabase,
        notification_db: MockDatabase,
        notification_block_db: MockDatabase,
    ) -> CommentService {
        CommentService::new(
            CommentRepository::new(Arc::new(comment_db.into_connection())),
            CommentVoteRepository::new(Arc::new(vote_db.into_connection())),
            PostRepository::new(Arc::new(post_db.into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
            PostBlockRepository::new(Arc::new(block_db.into_connection())),
            NotificationService::new(
                NotificationRepository::new(Arc::new(notification_db.into_connection())),
                NotificationBlockRepository::new(Arc::new(
                    notification_block_db.into_connection(),
                )),
            ),
        )
    }

    fn empty_db() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    #[test]
    fn test_extract_mentions_single() {
        let mentions = extract_mentions("Hello @user!");
        assert_eq!(mentions, vec!["user"]);
    }

    #[test]
    fn test_extract_mentions_multiple() {
        let mentions = extract_mentions("Hello @alice and @bob");
        assert_eq!(mentions, vec!["alice", "bob"]);
    }

    #[test]
    fn test_extract_mentions_dedup_keeps_order() {
        let mentions = extract_mentions("@bob no really @alice, @bob");
        assert_eq!(mentions, vec!["bob", "alice"]);
    }

    #[test]
    fn test_extract_mentions_underscore_and_digits() {
        let mentions = extract_mentions("ping @user_2");
        assert_eq!(mentions, vec!["user_2"]);
    }

    #[test]
    fn test_extract_mentions_empty() {
        let mentions = extract_mentions("Hello world");
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_extract_mentions_at_only() {
        let mentions = extract_mentions("Just @ symbol");
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_vote_direction_values() {
        assert_eq!(VoteDirection::Up.value(), 1);
        assert_eq!(VoteDirection::Down.value(), -1);
    }

    #[tokio::test]
    async fn test_create_comment_empty_text_returns_error() {
        let service = build_service(
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
        );

        let result = service.create("user1", "post1", "   ", None).await;
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Comment text is required")),
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_create_comment_post_not_found() {
        let post_db =
            empty_db().append_query_results([Vec::<post::Model>::new()]);

        let service = build_service(
            empty_db(),
            empty_db(),
            post_db,
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
        );

        let result = service.create("user1", "ghost", "Hello", None).await;
        match result {
            Err(AppError::PostNotFound(id)) => assert_eq!(id, "ghost"),
            _ => panic!("Expected PostNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_create_comment_blocked_author_returns_error() {
        let post_db = empty_db().append_query_results([[create_test_post("post1", "author1")]]);
        let block_db = empty_db().append_query_results([[post_block::Model {
            id: "pb1".to_string(),
            post_id: "post1".to_string(),
            user_id: "user1".to_string(),
            created_at: Utc::now().into(),
        }]]);

        let service = build_service(
            empty_db(),
            empty_db(),
            post_db,
            empty_db(),
            block_db,
            empty_db(),
            empty_db(),
        );

        let result = service.create("user1", "post1", "Hello", None).await;
        match result {
            Err(AppError::Forbidden(msg)) => assert!(msg.contains("blocked from commenting")),
            _ => panic!("Expected Forbidden error"),
        }
    }

    #[tokio::test]
    async fn test_create_root_comment_lands_pending() {
        let mut created = create_test_comment("comment1", "post1", "author1");
        created.status = ModerationStatus::Pending;

        let post_db = empty_db().append_query_results([[create_test_post("post1", "author1")]]);
        let block_db = empty_db().append_query_results([Vec::<post_block::Model>::new()]);
        // Commenting on one's own post skips the fan-out entirely.
        let comment_db = empty_db().append_query_results([[created]]);

        let service = build_service(
            comment_db,
            empty_db(),
            post_db,
            empty_db(),
            block_db,
            empty_db(),
            empty_db(),
        );

        let comment = service
            .create("author1", "post1", "First note", None)
            .await
            .unwrap();
        assert_eq!(comment.status, ModerationStatus::Pending);
        assert!(comment.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_create_comment_cross_post_parent_degrades_to_root() {
        let stray_parent = create_test_comment("comment9", "post2", "someone");

        let post_db = empty_db().append_query_results([[create_test_post("post1", "author1")]]);
        let block_db = empty_db().append_query_results([Vec::<post_block::Model>::new()]);
        let comment_db = empty_db().append_query_results([
            vec![stray_parent],
            vec![create_test_comment("comment1", "post1", "author1")],
        ]);

        let service = build_service(
            comment_db,
            empty_db(),
            post_db,
            empty_db(),
            block_db,
            empty_db(),
            empty_db(),
        );

        // The parent lives on another post, so this still lands as a root.
        let result = service
            .create("author1", "post1", "Hello", Some("comment9"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_reply_notifies_parent_author() {
        let parent = create_test_comment("comment1", "post1", "parent_author");
        let reply = comment::Model {
            parent_id: Some("comment1".to_string()),
            ..create_test_comment("comment2", "post1", "user1")
        };

        let post_db = empty_db().append_query_results([[create_test_post("post1", "author1")]]);
        let block_db = empty_db().append_query_results([Vec::<post_block::Model>::new()]);
        let comment_db = empty_db().append_query_results([vec![parent], vec![reply]]);
        let notification_block_db =
            empty_db().append_query_results([Vec::<notification_block::Model>::new()]);
        let notification_db =
            empty_db().append_query_results([[gazette_db::entities::notification::Model {
                id: "notif1".to_string(),
                user_id: "parent_author".to_string(),
                actor_id: "user1".to_string(),
                verb: "replied to your comment".to_string(),
                post_id: Some("post1".to_string()),
                comment_id: Some("comment2".to_string()),
                review_id: None,
                is_read: false,
                created_at: Utc::now().into(),
            }]]);

        let service = build_service(
            comment_db,
            empty_db(),
            post_db,
            empty_db(),
            block_db,
            notification_db,
            notification_block_db,
        );

        let comment = service
            .create("user1", "post1", "Replying", Some("comment1"))
            .await
            .unwrap();
        assert_eq!(comment.parent_id.as_deref(), Some("comment1"));
    }

    #[tokio::test]
    async fn test_vote_same_direction_removes_vote() {
        let comment_db =
            empty_db().append_query_results([[create_test_comment("comment1", "post1", "bob")]]);
        let vote_db = empty_db()
            .append_query_results([[create_test_vote("comment1", "user1", 1)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([
                vec![btreemap! { "num_items" => sea_orm::Value::BigInt(Some(0)) }],
                vec![btreemap! { "num_items" => sea_orm::Value::BigInt(Some(0)) }],
            ]);

        let service = build_service(
            comment_db,
            vote_db,
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
        );

        let score = service
            .vote("user1", "comment1", VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(score, 0);
    }

    #[tokio::test]
    async fn test_vote_opposite_direction_overwrites() {
        let comment_db =
            empty_db().append_query_results([[create_test_comment("comment1", "post1", "bob")]]);
        let vote_db = empty_db()
            .append_query_results([
                vec![create_test_vote("comment1", "user1", 1)],
                vec![create_test_vote("comment1", "user1", -1)],
            ])
            .append_query_results([
                vec![btreemap! { "num_items" => sea_orm::Value::BigInt(Some(0)) }],
                vec![btreemap! { "num_items" => sea_orm::Value::BigInt(Some(1)) }],
            ]);

        let service = build_service(
            comment_db,
            vote_db,
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
        );

        let score = service
            .vote("user1", "comment1", VoteDirection::Down)
            .await
            .unwrap();
        assert_eq!(score, -1);
    }

    #[tokio::test]
    async fn test_set_pinned_requires_post_author() {
        let comment_db =
            empty_db().append_query_results([[create_test_comment("comment1", "post1", "bob")]]);
        let post_db = empty_db().append_query_results([[create_test_post("post1", "author1")]]);

        let service = build_service(
            comment_db,
            empty_db(),
            post_db,
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
        );

        let result = service.set_pinned("intruder", "comment1", true).await;
        match result {
            Err(AppError::Forbidden(msg)) => {
                assert!(msg.contains("Only the post author can pin comments"));
            }
            _ => panic!("Expected Forbidden error"),
        }
    }

    #[tokio::test]
    async fn test_list_for_post_hides_pending_from_strangers() {
        let post_db = empty_db().append_query_results([[create_test_post("post1", "author1")]]);
        let comment_db =
            empty_db().append_query_results([[create_test_comment("comment1", "post1", "bob")]]);

        let service = build_service(
            comment_db,
            empty_db(),
            post_db,
            empty_db(),
            empty_db(),
            empty_db(),
            empty_db(),
        );

        let comments = service.list_for_post("post1", None).await.unwrap();
        assert_eq!(comments.len(), 1);
    }
}
