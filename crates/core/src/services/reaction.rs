//! Reaction service.

use std::collections::BTreeMap;

use chrono::Utc;
use gazette_common::{AppError, AppResult, IdGenerator};
use gazette_db::{
    entities::{
        comment::{self, ModerationStatus},
        reaction::{self, ReactionKind},
    },
    repositories::{CommentRepository, PostRepository, ReactionRepository, UserRepository},
};
use sea_orm::{ActiveEnum, Iterable, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Input for the data-bearing react operation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub post_id: String,
    pub kind: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i16>,
    #[validate(length(max = 500))]
    pub opinion: Option<String>,
}

/// The state of a post's reactions after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionOutcome {
    /// Per-kind totals, every kind present even at zero.
    pub counts: BTreeMap<String, u64>,
    /// The synthetic comment mirroring the reaction, when one exists.
    pub comment_id: Option<String>,
}

/// Reaction service for business logic.
///
/// Each user holds at most one reaction per post. Every reaction is mirrored
/// by a synthetic comment ("reacted with 👍") that appears in the post's
/// comment thread and disappears when the reaction is withdrawn.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub const fn new(
        reaction_repo: ReactionRepository,
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            reaction_repo,
            comment_repo,
            post_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Toggle a reaction. A first reaction of `kind` creates it, a different
    /// existing kind is switched in place, and repeating the same kind
    /// removes it. The synthetic comment follows along.
    pub async fn toggle(
        &self,
        actor_id: &str,
        post_id: &str,
        kind: &str,
    ) -> AppResult<ReactionOutcome> {
        let kind = Self::parse_kind(kind)?;

        // Check if post exists
        let post = self.post_repo.get_by_id(post_id).await?;

        let existing = self
            .reaction_repo
            .find_by_post_and_user(&post.id, actor_id)
            .await?;

        let existing = match existing {
            None => {
                let model = reaction::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    post_id: Set(post.id.clone()),
                    user_id: Set(actor_id.to_string()),
                    kind: Set(kind),
                    rating: Set(None),
                    opinion: Set(None),
                    created_at: Set(Utc::now().into()),
                };

                match self.reaction_repo.create(model).await {
                    Ok(_) => {
                        let comment_id =
                            self.sync_reaction_comment(&post.id, actor_id, kind).await?;
                        return self.outcome(&post.id, Some(comment_id)).await;
                    }
                    // A concurrent reaction by the same user won; toggle against it.
                    Err(AppError::Conflict(_)) => self
                        .reaction_repo
                        .find_by_post_and_user(&post.id, actor_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Conflict("Reaction changed concurrently".to_string())
                        })?,
                    Err(e) => return Err(e),
                }
            }
            Some(r) => r,
        };

        if existing.kind == kind {
            // Same kind again: withdraw the reaction and its synthetic comment.
            self.reaction_repo
                .delete_by_post_and_user(&post.id, actor_id)
                .await?;
            self.comment_repo
                .delete_reaction_comment(&post.id, actor_id)
                .await?;

            return self.outcome(&post.id, None).await;
        }

        // Different kind: switch in place.
        let mut active: reaction::ActiveModel = existing.into();
        active.kind = Set(kind);
        self.reaction_repo.update(active).await?;

        let comment_id = self.sync_reaction_comment(&post.id, actor_id, kind).await?;
        self.outcome(&post.id, Some(comment_id)).await
    }

    /// React with attached data. Rating and opinion land on the reaction
    /// row, overwriting whatever was there (absent values clear). Unlike
    /// `toggle`, repeating a kind never removes the reaction.
    pub async fn react(&self, actor_id: &str, input: ReactRequest) -> AppResult<ReactionOutcome> {
        // Validate input
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let kind = Self::parse_kind(&input.kind)?;

        // Check if post exists
        let post = self.post_repo.get_by_id(&input.post_id).await?;

        let existing = self
            .reaction_repo
            .find_by_post_and_user(&post.id, actor_id)
            .await?;

        let existing = match existing {
            None => {
                let model = reaction::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    post_id: Set(post.id.clone()),
                    user_id: Set(actor_id.to_string()),
                    kind: Set(kind),
                    rating: Set(input.rating),
                    opinion: Set(input.opinion.clone()),
                    created_at: Set(Utc::now().into()),
                };

                match self.reaction_repo.create(model).await {
                    Ok(_) => {
                        let comment_id =
                            self.sync_reaction_comment(&post.id, actor_id, kind).await?;
                        return self.outcome(&post.id, Some(comment_id)).await;
                    }
                    Err(AppError::Conflict(_)) => self
                        .reaction_repo
                        .find_by_post_and_user(&post.id, actor_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Conflict("Reaction changed concurrently".to_string())
                        })?,
                    Err(e) => return Err(e),
                }
            }
            Some(r) => r,
        };

        let mut active: reaction::ActiveModel = existing.into();
        active.kind = Set(kind);
        active.rating = Set(input.rating);
        active.opinion = Set(input.opinion);
        self.reaction_repo.update(active).await?;

        let comment_id = self.sync_reaction_comment(&post.id, actor_id, kind).await?;
        self.outcome(&post.id, Some(comment_id)).await
    }

    /// Per-kind reaction totals for a post. Every kind is present, zeros
    /// included, so clients can render the full palette.
    pub async fn counts(&self, post_id: &str) -> AppResult<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();

        for kind in ReactionKind::iter() {
            let n = self.reaction_repo.count_by_kind(post_id, kind).await?;
            counts.insert(kind.to_value(), n);
        }

        Ok(counts)
    }

    /// Usernames of everyone who reacted with a kind, newest first.
    pub async fn users_for(&self, post_id: &str, kind: &str) -> AppResult<Vec<String>> {
        let kind = Self::parse_kind(kind)?;

        let reactions = self
            .reaction_repo
            .find_by_post_and_kind(post_id, kind)
            .await?;
        let ids: Vec<String> = reactions.into_iter().map(|r| r.user_id).collect();

        let users = self.user_repo.find_by_ids(&ids).await?;

        Ok(users.into_iter().map(|u| u.username).collect())
    }

    async fn outcome(
        &self,
        post_id: &str,
        comment_id: Option<String>,
    ) -> AppResult<ReactionOutcome> {
        Ok(ReactionOutcome {
            counts: self.counts(post_id).await?,
            comment_id,
        })
    }

    /// Create or refresh the synthetic comment mirroring a reaction.
    async fn sync_reaction_comment(
        &self,
        post_id: &str,
        actor_id: &str,
        kind: ReactionKind,
    ) -> AppResult<String> {
        let text = format!("reacted with {}", kind.emoji());

        if let Some(existing) = self
            .comment_repo
            .find_reaction_comment(post_id, actor_id)
            .await?
        {
            let mut active: comment::ActiveModel = existing.into();
            active.text = Set(text);
            let updated = self.comment_repo.update(active).await?;
            return Ok(updated.id);
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            author_id: Set(Some(actor_id.to_string())),
            text: Set(text.clone()),
            status: Set(ModerationStatus::Visible),
            parent_id: Set(None),
            pinned: Set(false),
            is_reaction: Set(true),
            created_at: Set(Utc::now().into()),
        };

        match self.comment_repo.create(model).await {
            Ok(created) => Ok(created.id),
            // Lost the race to a concurrent reaction; refresh that row.
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .comment_repo
                    .find_reaction_comment(post_id, actor_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Conflict("Reaction comment changed concurrently".to_string())
                    })?;

                let mut active: comment::ActiveModel = existing.into();
                active.text = Set(text);
                let updated = self.comment_repo.update(active).await?;
                Ok(updated.id)
            }
            Err(e) => Err(e),
        }
    }

    /// Parse a reaction kind from its wire value.
    fn parse_kind(kind: &str) -> AppResult<ReactionKind> {
        ReactionKind::try_from_value(&kind.to_string())
            .map_err(|_| AppError::Validation(format!("Unknown reaction kind: {kind}")))
    }
}
