//! `SeaORM` entities for the gazette schema.

pub mod comment;
pub mod comment_vote;
pub mod notification;
pub mod notification_block;
pub mod post;
pub mod post_block;
pub mod post_tag;
pub mod reaction;
pub mod review;
pub mod review_vote;
pub mod subscription;
pub mod tag;
pub mod user;

pub use comment::Entity as Comment;
pub use comment_vote::Entity as CommentVote;
pub use notification::Entity as Notification;
pub use notification_block::Entity as NotificationBlock;
pub use post::Entity as Post;
pub use post_block::Entity as PostBlock;
pub use post_tag::Entity as PostTag;
pub use reaction::Entity as Reaction;
pub use review::Entity as Review;
pub use review_vote::Entity as ReviewVote;
pub use subscription::Entity as Subscription;
pub use tag::Entity as Tag;
pub use user::Entity as User;
