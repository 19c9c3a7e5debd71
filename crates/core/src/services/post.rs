//! Post service.

use chrono::Utc;
use gazette_common::{AppError, AppResult, IdGenerator, slug_candidate, slugify};
use gazette_db::{
    entities::{post, post_tag, tag},
    repositories::{PostRepository, ReviewRepository, TagRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use gazette_db::entities::post::PostStatus;

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 300))]
    pub excerpt: Option<String>,
    pub content: String,
    pub status: PostStatus,
    #[validate(length(max = 64))]
    pub platform: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating a post. Double options distinguish "leave unchanged"
/// from "clear the field".
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 300))]
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub platform: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub regenerate_slug: bool,
}

/// Aggregate rating for a post.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average: f64,
    pub count: u64,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    tag_repo: TagRepository,
    user_repo: UserRepository,
    review_repo: ReviewRepository,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        tag_repo: TagRepository,
        user_repo: UserRepository,
        review_repo: ReviewRepository,
    ) -> Self {
        Self {
            post_repo,
            tag_repo,
            user_repo,
            review_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post. The slug is derived from the title; collisions
    /// get a numeric suffix, retrying until the unique index accepts one.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        // Validate input
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // Check if author exists
        self.user_repo.get_by_id(author_id).await?;

        let base = slugify(&input.title);
        let now = Utc::now();

        let mut attempt: u32 = 1;
        let created = loop {
            let candidate = slug_candidate(&base, attempt);

            // Cheap precheck; the unique index has the final say.
            if self.post_repo.slug_exists(&candidate).await? {
                attempt += 1;
                continue;
            }

            let model = post::ActiveModel {
                id: Set(self.id_gen.generate()),
                title: Set(input.title.clone()),
                slug: Set(candidate),
                author_id: Set(author_id.to_string()),
                excerpt: Set(input.excerpt.clone()),
                content: Set(input.content.clone()),
                status: Set(input.status.clone()),
                platform: Set(input.platform.clone()),
                is_visible: Set(true),
                created_at: Set(now.into()),
                updated_at: Set(None),
            };

            match self.post_repo.create(model).await {
                Ok(created) => break created,
                // Lost the race for this suffix; try the next one.
                Err(AppError::Conflict(_)) => attempt += 1,
                Err(e) => return Err(e),
            }
        };

        self.attach_tags(&created.id, &input.tags).await?;

        Ok(created)
    }

    /// Update a post. Author-only. The slug stays put unless
    /// `regenerate_slug` asks for a re-derivation from the current title.
    pub async fn update(
        &self,
        actor_id: &str,
        post_id: &str,
        input: UpdatePostInput,
    ) -> AppResult<post::Model> {
        // Validate input
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // Get post and verify ownership
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Cannot update another user's post".to_string(),
            ));
        }

        let title = input.title.clone().unwrap_or_else(|| post.title.clone());

        let mut active: post::ActiveModel = post.into();
        if let Some(t) = input.title {
            active.title = Set(t);
        }
        if let Some(excerpt) = input.excerpt {
            active.excerpt = Set(excerpt);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(platform) = input.platform {
            active.platform = Set(platform);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = if input.regenerate_slug {
            let base = slugify(&title);
            let mut attempt: u32 = 1;
            loop {
                let candidate = slug_candidate(&base, attempt);

                if self
                    .post_repo
                    .slug_exists_excluding(&candidate, post_id)
                    .await?
                {
                    attempt += 1;
                    continue;
                }

                active.slug = Set(candidate);
                match self.post_repo.update(active.clone()).await {
                    Ok(updated) => break updated,
                    Err(AppError::Conflict(_)) => attempt += 1,
                    Err(e) => return Err(e),
                }
            }
        } else {
            self.post_repo.update(active).await?
        };

        if let Some(tags) = input.tags {
            self.tag_repo.clear_post(post_id).await?;
            self.attach_tags(post_id, &tags).await?;
        }

        Ok(updated)
    }

    /// Delete a post. Author-only. Comments, reviews, reactions and blocks
    /// go with it via FK cascade.
    pub async fn delete(&self, actor_id: &str, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Cannot delete another user's post".to_string(),
            ));
        }

        self.post_repo.delete(post_id).await
    }

    /// Get a post by slug. Drafts and hidden posts stay readable only for
    /// their author and for staff.
    pub async fn get_by_slug(&self, slug: &str, viewer_id: Option<&str>) -> AppResult<post::Model> {
        let post = self
            .post_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::PostNotFound(slug.to_string()))?;

        if post.status == PostStatus::Published && post.is_visible {
            return Ok(post);
        }

        if let Some(viewer) = viewer_id {
            if viewer == post.author_id {
                return Ok(post);
            }
            if let Some(user) = self.user_repo.find_by_id(viewer).await?
                && user.is_staff
            {
                return Ok(post);
            }
        }

        Err(AppError::PostNotFound(slug.to_string()))
    }

    /// Get the published feed, newest first.
    pub async fn list_published(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo.list_published(limit, until_id).await
    }

    /// Free-text search over published posts' titles and bodies.
    pub async fn search(
        &self,
        query: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        if query.trim().is_empty() {
            return self.post_repo.list_published(limit, until_id).await;
        }

        self.post_repo.search(query, limit, until_id).await
    }

    /// Get published posts carrying a tag.
    pub async fn list_by_tag(
        &self,
        tag_slug: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let tag = self
            .tag_repo
            .find_by_slug(tag_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag not found: {tag_slug}")))?;

        self.post_repo.find_by_tag(&tag.id, limit, until_id).await
    }

    /// Get published posts for a platform.
    pub async fn list_by_platform(
        &self,
        platform: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo
            .find_by_platform(platform, limit, until_id)
            .await
    }

    /// Get posts by an author. The author sees their own drafts and hidden
    /// posts; everyone else sees the published feed.
    pub async fn list_by_author(
        &self,
        author_id: &str,
        viewer_id: Option<&str>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let include_unpublished = viewer_id.is_some_and(|v| v == author_id);

        self.post_repo
            .find_by_author(author_id, include_unpublished, limit, until_id)
            .await
    }

    /// Aggregate rating for a post: the mean of root-review ratings rounded
    /// to two decimals, plus the total review count (replies included).
    pub async fn rating_summary(&self, post_id: &str) -> AppResult<RatingSummary> {
        let ratings = self.review_repo.find_ratings(post_id).await?;
        let count = self.review_repo.count_for_post(post_id).await?;

        let average = if ratings.is_empty() {
            0.0
        } else {
            let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
            let mean = sum as f64 / ratings.len() as f64;
            (mean * 100.0).round() / 100.0
        };

        Ok(RatingSummary { average, count })
    }

    async fn attach_tags(&self, post_id: &str, names: &[String]) -> AppResult<()> {
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let tag = self.resolve_tag(name).await?;

            let join = post_tag::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.to_string()),
                tag_id: Set(tag.id),
            };

            // Already joined is fine.
            match self.tag_repo.attach(join).await {
                Ok(_) | Err(AppError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Find a tag by name, creating it when missing.
    async fn resolve_tag(&self, name: &str) -> AppResult<tag::Model> {
        if let Some(existing) = self.tag_repo.find_by_name(name).await? {
            return Ok(existing);
        }

        let model = tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            slug: Set(slugify(name)),
            ..Default::default()
        };

        match self.tag_repo.create(model).await {
            Ok(created) => Ok(created),
            // Lost the race to a concurrent creator; use theirs.
            Err(AppError::Conflict(_)) => self
                .tag_repo
                .find_by_name(name)
                .await?
                .ok_or_else(|| AppError::Internal(format!("Tag vanished after conflict: {name}"))),
            Err(e) => Err(e),
        }
    }
}
