//! Notification service.

use gazette_common::{AppResult, IdGenerator};
use gazette_db::{
    entities::notification,
    repositories::{NotificationBlockRepository, NotificationRepository},
};
use sea_orm::Set;

/// Notification service for business logic.
///
/// Fan-out is mute-aware: a recipient who has muted the actor receives
/// nothing, and nobody is notified about their own actions. Either way the
/// triggering write itself is unaffected.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    notification_block_repo: NotificationBlockRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        notification_block_repo: NotificationBlockRepository,
    ) -> Self {
        Self {
            notification_repo,
            notification_block_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Notify a post author about a new root comment.
    pub async fn notify_post_commented(
        &self,
        recipient_id: &str,
        actor_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            actor_id,
            "commented on your post",
            post_id,
            Some(comment_id),
            None,
        )
        .await
    }

    /// Notify a comment author about a reply. The comment id points at the
    /// reply, not the parent.
    pub async fn notify_comment_replied(
        &self,
        recipient_id: &str,
        actor_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            actor_id,
            "replied to your comment",
            post_id,
            Some(comment_id),
            None,
        )
        .await
    }

    /// Notify a user who was @-mentioned in a comment.
    pub async fn notify_mentioned(
        &self,
        recipient_id: &str,
        actor_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            actor_id,
            "mentioned you in a comment",
            post_id,
            Some(comment_id),
            None,
        )
        .await
    }

    /// Notify a post author about a new root review.
    pub async fn notify_review_left(
        &self,
        recipient_id: &str,
        actor_id: &str,
        post_id: &str,
        review_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            actor_id,
            "left a review on your post",
            post_id,
            None,
            Some(review_id),
        )
        .await
    }

    /// Notify a review author about a reply. The review id points at the
    /// parent review the reply threads under.
    pub async fn notify_review_replied(
        &self,
        recipient_id: &str,
        actor_id: &str,
        post_id: &str,
        review_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            actor_id,
            "replied to your review",
            post_id,
            None,
            Some(review_id),
        )
        .await
    }

    /// Internal helper to create notifications.
    async fn create_internal(
        &self,
        recipient_id: &str,
        actor_id: &str,
        verb: &str,
        post_id: &str,
        comment_id: Option<&str>,
        review_id: Option<&str>,
    ) -> AppResult<Option<notification::Model>> {
        // Don't notify users about their own actions
        if recipient_id == actor_id {
            return Ok(None);
        }

        // Respect mutes
        if self
            .notification_block_repo
            .is_blocking(recipient_id, actor_id)
            .await?
        {
            return Ok(None);
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(recipient_id.to_string()),
            actor_id: Set(actor_id.to_string()),
            verb: Set(verb.to_string()),
            post_id: Set(Some(post_id.to_string())),
            comment_id: Set(comment_id.map(std::string::ToString::to_string)),
            review_id: Set(review_id.map(std::string::ToString::to_string)),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;

        tracing::debug!(
            notification_id = %notification.id,
            recipient_id = %recipient_id,
            verb = %verb,
            "Delivered notification"
        );

        Ok(Some(notification))
    }

    /// Get notifications for a user.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, until_id, unread_only)
            .await
    }

    /// Mark a notification as read.
    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        // Verify the notification belongs to the user
        let notification = self.notification_repo.find_by_id(notification_id).await?;
        if let Some(n) = notification
            && n.user_id == user_id
        {
            self.notification_repo.mark_as_read(notification_id).await?;
        }
        Ok(())
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }
}
