//! Moderation service for post authors' control over comments and reviews.

use gazette_common::{AppError, AppResult, IdGenerator};
use gazette_db::{
    entities::{comment, post_block, review},
    repositories::{CommentRepository, PostBlockRepository, PostRepository, ReviewRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

pub use gazette_db::entities::comment::ModerationStatus;

/// Moderation verb applied to a comment or review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    /// Approve the entry for public listings.
    Show,
    /// Retract the entry from public listings.
    Hide,
    /// Mark the entry blocked and toggle its author's ban on the post.
    Block,
    /// Remove the entry permanently.
    Delete,
}

/// Moderation service for business logic.
///
/// All verbs are reserved to the post author. `Block` doubles as the ban
/// toggle: the first use bans the entry's author from the post, a repeat
/// lifts the ban, and the entry keeps its blocked status either way.
#[derive(Clone)]
pub struct ModerationService {
    comment_repo: CommentRepository,
    review_repo: ReviewRepository,
    post_repo: PostRepository,
    post_block_repo: PostBlockRepository,
    id_gen: IdGenerator,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        review_repo: ReviewRepository,
        post_repo: PostRepository,
        post_block_repo: PostBlockRepository,
    ) -> Self {
        Self {
            comment_repo,
            review_repo,
            post_repo,
            post_block_repo,
            id_gen: IdGenerator::new(),
        }
    }

    // ========== Comments ==========

    /// Apply a moderation action to a comment. Returns the updated row, or
    /// `None` when the action deleted it.
    pub async fn moderate_comment(
        &self,
        actor_id: &str,
        comment_id: &str,
        action: ModerationAction,
    ) -> AppResult<Option<comment::Model>> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        let post = self.post_repo.get_by_id(&comment.post_id).await?;

        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the post author can moderate this comment".to_string(),
            ));
        }

        match action {
            ModerationAction::Show => self
                .set_comment_status(comment, ModerationStatus::Visible)
                .await
                .map(Some),
            ModerationAction::Hide => self
                .set_comment_status(comment, ModerationStatus::Hidden)
                .await
                .map(Some),
            ModerationAction::Delete => {
                self.comment_repo.delete(&comment.id).await?;
                Ok(None)
            }
            ModerationAction::Block => {
                let author_id = comment.author_id.clone().ok_or_else(|| {
                    AppError::BadRequest("Comment has no author to block".to_string())
                })?;

                self.toggle_block(&post.id, &author_id).await?;

                self.set_comment_status(comment, ModerationStatus::Blocked)
                    .await
                    .map(Some)
            }
        }
    }

    async fn set_comment_status(
        &self,
        comment: comment::Model,
        status: ModerationStatus,
    ) -> AppResult<comment::Model> {
        let mut active: comment::ActiveModel = comment.into();
        active.status = Set(status);
        self.comment_repo.update(active).await
    }

    // ========== Reviews ==========

    /// Apply a moderation action to a review. Returns the updated row, or
    /// `None` when the action deleted it.
    pub async fn moderate_review(
        &self,
        actor_id: &str,
        review_id: &str,
        action: ModerationAction,
    ) -> AppResult<Option<review::Model>> {
        let review = self.review_repo.get_by_id(review_id).await?;
        let post = self.post_repo.get_by_id(&review.post_id).await?;

        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the post author can moderate this review".to_string(),
            ));
        }

        match action {
            ModerationAction::Show => self
                .set_review_status(review, ModerationStatus::Visible)
                .await
                .map(Some),
            ModerationAction::Hide => self
                .set_review_status(review, ModerationStatus::Hidden)
                .await
                .map(Some),
            ModerationAction::Delete => {
                self.review_repo.delete(&review.id).await?;
                Ok(None)
            }
            ModerationAction::Block => {
                let author_id = review.user_id.clone();

                self.toggle_block(&post.id, &author_id).await?;

                self.set_review_status(review, ModerationStatus::Blocked)
                    .await
                    .map(Some)
            }
        }
    }

    async fn set_review_status(
        &self,
        review: review::Model,
        status: ModerationStatus,
    ) -> AppResult<review::Model> {
        let mut active: review::ActiveModel = review.into();
        active.status = Set(status);
        self.review_repo.update(active).await
    }

    /// Check whether a user is banned from a post.
    pub async fn is_blocked(&self, post_id: &str, user_id: &str) -> AppResult<bool> {
        self.post_block_repo.is_blocked(post_id, user_id).await
    }

    /// Ban toggle on the (post, user) pair.
    async fn toggle_block(&self, post_id: &str, user_id: &str) -> AppResult<()> {
        if self.post_block_repo.is_blocked(post_id, user_id).await? {
            // Second use lifts the ban.
            self.post_block_repo
                .delete_by_pair(post_id, user_id)
                .await?;
            return Ok(());
        }

        let model = post_block::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            user_id: Set(user_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        match self.post_block_repo.create(model).await {
            // A concurrent ban of the same pair landed first; same outcome.
            Ok(_) | Err(AppError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
