//! Repository layer over the gazette entities.

mod comment;
mod comment_vote;
mod notification;
mod notification_block;
mod post;
mod post_block;
mod reaction;
mod review;
mod review_vote;
mod subscription;
mod tag;
mod user;

pub use comment::CommentRepository;
pub use comment_vote::CommentVoteRepository;
pub use notification::NotificationRepository;
pub use notification_block::NotificationBlockRepository;
pub use post::PostRepository;
pub use post_block::PostBlockRepository;
pub use reaction::ReactionRepository;
pub use review::ReviewRepository;
pub use review_vote::ReviewVoteRepository;
pub use subscription::SubscriptionRepository;
pub use tag::TagRepository;
pub use user::UserRepository;
