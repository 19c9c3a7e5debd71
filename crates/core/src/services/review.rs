//! Review service.

use chrono::Utc;
use gazette_common::{AppError, AppResult, IdGenerator};
use gazette_db::{
    entities::{
        post,
        review::{self, ModerationStatus},
        review_vote::{self, ReviewVoteKind},
    },
    repositories::{
        PostBlockRepository, PostRepository, ReviewRepository, ReviewVoteRepository,
        UserRepository,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::notification::NotificationService;

/// Input for leaving or updating a review.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReviewInput {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i16>,
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
    pub parent_id: Option<String>,
}

/// Like/dislike tally for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub likes: u64,
    pub dislikes: u64,
}

/// Review service for business logic.
#[derive(Clone)]
pub struct ReviewService {
    review_repo: ReviewRepository,
    review_vote_repo: ReviewVoteRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    post_block_repo: PostBlockRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl ReviewService {
    /// Create a new review service.
    #[must_use]
    pub const fn new(
        review_repo: ReviewRepository,
        review_vote_repo: ReviewVoteRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        post_block_repo: PostBlockRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            review_repo,
            review_vote_repo,
            post_repo,
            user_repo,
            post_block_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Leave a review on a post, or update one's existing root review in
    /// place. Root reviews need a rating and await moderation; replies carry
    /// no rating and are visible immediately.
    pub async fn upsert(
        &self,
        actor_id: &str,
        post_id: &str,
        input: UpsertReviewInput,
    ) -> AppResult<review::Model> {
        // Validate input
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // Check if post exists
        let post = self.post_repo.get_by_id(post_id).await?;

        // Check if the author is banned from this post
        if self.post_block_repo.is_blocked(&post.id, actor_id).await? {
            return Err(AppError::Forbidden(
                "You are blocked from reviewing this post".to_string(),
            ));
        }

        if let Some(parent_id) = input.parent_id.as_deref() {
            return self
                .create_reply(actor_id, &post, parent_id, input.body)
                .await;
        }

        // One root review per user per post
        let rating = input.rating.ok_or_else(|| {
            AppError::Validation("Rating is required for a root review".to_string())
        })?;

        if let Some(existing) = self
            .review_repo
            .find_root_by_post_and_user(&post.id, actor_id)
            .await?
        {
            return self.overwrite_root(existing, rating, input.body).await;
        }

        let model = review::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            user_id: Set(actor_id.to_string()),
            parent_id: Set(None),
            rating: Set(Some(rating)),
            body: Set(input.body.clone()),
            status: Set(ModerationStatus::Pending),
            pinned: Set(false),
            created_at: Set(Utc::now().into()),
        };

        match self.review_repo.create(model).await {
            Ok(created) => {
                // Only a fresh root review notifies the post author.
                if let Err(e) = self
                    .notifications
                    .notify_review_left(&post.author_id, actor_id, &post.id, &created.id)
                    .await
                {
                    tracing::warn!(
                        error = %e,
                        review_id = %created.id,
                        "Failed to deliver review notification"
                    );
                }

                Ok(created)
            }
            // A concurrent root review by the same user won; update it.
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .review_repo
                    .find_root_by_post_and_user(&post.id, actor_id)
                    .await?
                    .ok_or_else(|| AppError::Conflict("Review changed concurrently".to_string()))?;

                self.overwrite_root(existing, rating, input.body).await
            }
            Err(e) => Err(e),
        }
    }

    async fn overwrite_root(
        &self,
        existing: review::Model,
        rating: i16,
        body: String,
    ) -> AppResult<review::Model> {
        let mut active: review::ActiveModel = existing.into();
        active.rating = Set(Some(rating));
        active.body = Set(body);
        // An edited review goes back through moderation.
        active.status = Set(ModerationStatus::Pending);

        self.review_repo.update(active).await
    }

    async fn create_reply(
        &self,
        actor_id: &str,
        post: &post::Model,
        parent_id: &str,
        body: String,
    ) -> AppResult<review::Model> {
        // Replies thread strictly under a review on the same post.
        let parent = self
            .review_repo
            .find_by_id(parent_id)
            .await?
            .filter(|p| p.post_id == post.id)
            .ok_or_else(|| AppError::ReviewNotFound(parent_id.to_string()))?;

        let model = review::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            user_id: Set(actor_id.to_string()),
            parent_id: Set(Some(parent.id.clone())),
            rating: Set(None),
            body: Set(body),
            status: Set(ModerationStatus::Visible),
            pinned: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let created = self.review_repo.create(model).await?;

        // The notification points at the parent the reply threads under.
        if let Err(e) = self
            .notifications
            .notify_review_replied(&parent.user_id, actor_id, &post.id, &parent.id)
            .await
        {
            tracing::warn!(
                error = %e,
                review_id = %created.id,
                "Failed to deliver review reply notification"
            );
        }

        Ok(created)
    }

    /// Vote on a review. Repeating a vote removes it; the opposite kind
    /// overwrites it. Returns the resulting tally.
    pub async fn vote(
        &self,
        actor_id: &str,
        review_id: &str,
        vote: ReviewVoteKind,
    ) -> AppResult<VoteTally> {
        // Check if review exists
        let review = self.review_repo.get_by_id(review_id).await?;

        let existing = self
            .review_vote_repo
            .find_by_pair(&review.id, actor_id)
            .await?;

        match existing {
            None => {
                let model = review_vote::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    review_id: Set(review.id.clone()),
                    user_id: Set(actor_id.to_string()),
                    vote: Set(vote.clone()),
                    created_at: Set(Utc::now().into()),
                };

                match self.review_vote_repo.create(model).await {
                    Ok(_) => {}
                    // A concurrent vote by the same user won; re-apply.
                    Err(AppError::Conflict(_)) => {
                        let current = self
                            .review_vote_repo
                            .find_by_pair(&review.id, actor_id)
                            .await?
                            .ok_or_else(|| {
                                AppError::Conflict("Vote changed concurrently".to_string())
                            })?;

                        if current.vote == vote {
                            self.review_vote_repo
                                .delete_by_pair(&review.id, actor_id)
                                .await?;
                        } else {
                            let mut active: review_vote::ActiveModel = current.into();
                            active.vote = Set(vote);
                            self.review_vote_repo.update(active).await?;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(current) if current.vote == vote => {
                self.review_vote_repo
                    .delete_by_pair(&review.id, actor_id)
                    .await?;
            }
            Some(current) => {
                let mut active: review_vote::ActiveModel = current.into();
                active.vote = Set(vote);
                self.review_vote_repo.update(active).await?;
            }
        }

        self.tally(&review.id).await
    }

    /// Like and dislike counts for a review.
    pub async fn tally(&self, review_id: &str) -> AppResult<VoteTally> {
        let likes = self
            .review_vote_repo
            .count_by_vote(review_id, ReviewVoteKind::Like)
            .await?;
        let dislikes = self
            .review_vote_repo
            .count_by_vote(review_id, ReviewVoteKind::Dislike)
            .await?;

        Ok(VoteTally { likes, dislikes })
    }

    /// Pin or unpin a review. Only the post author can pin.
    pub async fn set_pinned(
        &self,
        actor_id: &str,
        review_id: &str,
        pinned: bool,
    ) -> AppResult<review::Model> {
        let review = self.review_repo.get_by_id(review_id).await?;
        let post = self.post_repo.get_by_id(&review.post_id).await?;

        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the post author can pin reviews".to_string(),
            ));
        }

        let mut active: review::ActiveModel = review.into();
        active.pinned = Set(pinned);

        self.review_repo.update(active).await
    }

    /// Get root reviews on a post, pinned first then newest first.
    /// Rows held back by moderation stay visible to the post author and staff.
    pub async fn list_for_post(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<review::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let visible_only = !self.can_view_all(&post, viewer_id).await?;

        self.review_repo
            .find_roots_by_post(&post.id, visible_only)
            .await
    }

    /// Get replies to a review, newest first.
    pub async fn list_replies(
        &self,
        parent_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<review::Model>> {
        let parent = self.review_repo.get_by_id(parent_id).await?;
        let post = self.post_repo.get_by_id(&parent.post_id).await?;
        let visible_only = !self.can_view_all(&post, viewer_id).await?;

        self.review_repo.find_replies(&parent.id, visible_only).await
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
