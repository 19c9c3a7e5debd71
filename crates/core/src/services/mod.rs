//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod moderation;
pub mod muting;
pub mod notification;
pub mod post;
pub mod reaction;
pub mod review;
pub mod subscription;

pub use comment::{CommentService, VoteDirection};
pub use moderation::{ModerationAction, ModerationService, ModerationStatus};
pub use muting::MutingService;
pub use notification::NotificationService;
pub use post::{CreatePostInput, PostService, RatingSummary, UpdatePostInput};
pub use reaction::{ReactRequest, ReactionOutcome, ReactionService};
pub use review::{ReviewService, UpsertReviewInput, VoteTally};
pub use subscription::{SubscriptionLists, SubscriptionService, ToggleOutcome};
