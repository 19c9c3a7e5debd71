//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `gazette_test`)
//!   `TEST_DB_PASSWORD` (default: `gazette_test`)
//!   `TEST_DB_NAME` (default: `gazette_test`)

#![allow(clippy::unwrap_used)]

use gazette_common::{AppError, IdGenerator};
use gazette_db::entities::comment::ModerationStatus;
use gazette_db::entities::post::PostStatus;
use gazette_db::entities::{comment, post, post_block, review, subscription, tag, user};
use gazette_db::repositories::{
    CommentRepository, PostBlockRepository, PostRepository, ReviewRepository,
    SubscriptionRepository, TagRepository, UserRepository,
};
use gazette_db::test_utils::{init_test_logging, TestDatabase, TestDbConfig};
use sea_orm::{ActiveValue::Set, DatabaseConnection};
use std::sync::Arc;

/// Create a throwaway database with all migrations applied.
async fn setup() -> (TestDatabase, Arc<DatabaseConnection>) {
    init_test_logging();
    let db = TestDatabase::create_unique()
        .await
        .expect("Failed to create test database");
    gazette_db::migrate(db.connection())
        .await
        .expect("Failed to run migrations");
    let conn = Arc::clone(&db.conn);
    (db, conn)
}

fn now() -> chrono::DateTime<chrono::FixedOffset> {
    chrono::Utc::now().fixed_offset()
}

async fn seed_user(conn: &Arc<DatabaseConnection>, username: &str) -> user::Model {
    UserRepository::new(Arc::clone(conn))
        .create(user::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            username: Set(username.to_string()),
            display_name: Set(None),
            is_staff: Set(false),
            created_at: Set(now()),
            updated_at: Set(None),
        })
        .await
        .expect("Failed to seed user")
}

async fn seed_post(conn: &Arc<DatabaseConnection>, author_id: &str, slug: &str) -> post::Model {
    PostRepository::new(Arc::clone(conn))
        .create(post::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            title: Set("Release notes".to_string()),
            slug: Set(slug.to_string()),
            author_id: Set(author_id.to_string()),
            excerpt: Set(None),
            content: Set("Full changelog below.".to_string()),
            status: Set(PostStatus::Published),
            platform: Set(None),
            is_visible: Set(true),
            created_at: Set(now()),
            updated_at: Set(None),
        })
        .await
        .expect("Failed to seed post")
}

fn comment_model(post_id: &str, author_id: &str, is_reaction: bool) -> comment::ActiveModel {
    comment::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        post_id: Set(post_id.to_string()),
        author_id: Set(Some(author_id.to_string())),
        text: Set("First!".to_string()),
        status: Set(ModerationStatus::Pending),
        parent_id: Set(None),
        pinned: Set(false),
        is_reaction: Set(is_reaction),
        created_at: Set(now()),
    }
}

fn review_model(post_id: &str, user_id: &str, parent_id: Option<String>) -> review::ActiveModel {
    let rating = if parent_id.is_some() { None } else { Some(4) };
    review::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        post_id: Set(post_id.to_string()),
        user_id: Set(user_id.to_string()),
        parent_id: Set(parent_id),
        rating: Set(rating),
        body: Set("Solid release.".to_string()),
        status: Set(ModerationStatus::Pending),
        pinned: Set(false),
        created_at: Set(now()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrations_are_idempotent() {
    let (db, _conn) = setup().await;

    // A second run must be a no-op, not an error.
    let result = gazette_db::migrate(db.connection()).await;
    assert!(result.is_ok(), "Re-run failed: {:?}", result.err());

    db.drop_database().await.expect("Failed to drop database");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_slug_is_conflict() {
    let (db, conn) = setup().await;
    let author = seed_user(&conn, "alice").await;
    seed_post(&conn, &author.id, "release-notes").await;

    let repo = PostRepository::new(Arc::clone(&conn));
    let err = repo
        .create(post::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            title: Set("Release notes".to_string()),
            slug: Set("release-notes".to_string()),
            author_id: Set(author.id.clone()),
            excerpt: Set(None),
            content: Set("Same slug, different post.".to_string()),
            status: Set(PostStatus::Published),
            platform: Set(None),
            is_visible: Set(true),
            created_at: Set(now()),
            updated_at: Set(None),
        })
        .await
        .unwrap_err();

    assert!(
        matches!(err, AppError::Conflict(_)),
        "Expected Conflict, got {err:?}"
    );

    db.drop_database().await.expect("Failed to drop database");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_single_root_review_per_user() {
    let (db, conn) = setup().await;
    let author = seed_user(&conn, "alice").await;
    let reviewer = seed_user(&conn, "bob").await;
    let post = seed_post(&conn, &author.id, "release-notes").await;

    let repo = ReviewRepository::new(Arc::clone(&conn));
    let root = repo
        .create(review_model(&post.id, &reviewer.id, None))
        .await
        .expect("Failed to create root review");

    // Second root for the same (post, user) pair trips the partial unique index.
    let err = repo
        .create(review_model(&post.id, &reviewer.id, None))
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Conflict(_)),
        "Expected Conflict, got {err:?}"
    );

    // Replies are exempt: same user may answer under their own root.
    let reply = repo
        .create(review_model(&post.id, &reviewer.id, Some(root.id.clone())))
        .await
        .expect("Failed to create reply");
    assert_eq!(reply.rating, None);

    db.drop_database().await.expect("Failed to drop database");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_subscription_single_target_enforced() {
    let (db, conn) = setup().await;
    let subscriber = seed_user(&conn, "alice").await;
    let author = seed_user(&conn, "bob").await;

    let tag = TagRepository::new(Arc::clone(&conn))
        .create(tag::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            name: Set("rust".to_string()),
            slug: Set("rust".to_string()),
            created_at: Set(now()),
        })
        .await
        .expect("Failed to seed tag");

    let repo = SubscriptionRepository::new(Arc::clone(&conn));

    // Both targets set violates the single-target check constraint.
    let err = repo
        .create(subscription::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            user_id: Set(subscriber.id.clone()),
            author_id: Set(Some(author.id.clone())),
            tag_id: Set(Some(tag.id.clone())),
            created_at: Set(now()),
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Database(_)),
        "Expected Database, got {err:?}"
    );

    // Neither target set violates it too.
    let err = repo
        .create(subscription::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            user_id: Set(subscriber.id.clone()),
            author_id: Set(None),
            tag_id: Set(None),
            created_at: Set(now()),
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Database(_)),
        "Expected Database, got {err:?}"
    );

    // Exactly one target is accepted.
    let sub = repo
        .create(subscription::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            user_id: Set(subscriber.id.clone()),
            author_id: Set(Some(author.id.clone())),
            tag_id: Set(None),
            created_at: Set(now()),
        })
        .await
        .expect("Failed to create subscription");
    assert_eq!(sub.tag_id, None);

    db.drop_database().await.expect("Failed to drop database");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_reaction_comment_unique_per_author() {
    let (db, conn) = setup().await;
    let author = seed_user(&conn, "alice").await;
    let reactor = seed_user(&conn, "bob").await;
    let post = seed_post(&conn, &author.id, "release-notes").await;

    let repo = CommentRepository::new(Arc::clone(&conn));
    repo.create(comment_model(&post.id, &reactor.id, true))
        .await
        .expect("Failed to create reaction comment");

    // One synthetic comment per (post, author).
    let err = repo
        .create(comment_model(&post.id, &reactor.id, true))
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Conflict(_)),
        "Expected Conflict, got {err:?}"
    );

    // Ordinary comments from the same author are unconstrained.
    repo.create(comment_model(&post.id, &reactor.id, false))
        .await
        .expect("Failed to create ordinary comment");
    repo.create(comment_model(&post.id, &reactor.id, false))
        .await
        .expect("Failed to create second ordinary comment");

    db.drop_database().await.expect("Failed to drop database");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_post_delete_cascades() {
    let (db, conn) = setup().await;
    let author = seed_user(&conn, "alice").await;
    let commenter = seed_user(&conn, "bob").await;
    let post = seed_post(&conn, &author.id, "release-notes").await;

    let comment_repo = CommentRepository::new(Arc::clone(&conn));
    let review_repo = ReviewRepository::new(Arc::clone(&conn));

    let comment = comment_repo
        .create(comment_model(&post.id, &commenter.id, false))
        .await
        .expect("Failed to create comment");
    let review = review_repo
        .create(review_model(&post.id, &commenter.id, None))
        .await
        .expect("Failed to create review");

    PostRepository::new(Arc::clone(&conn))
        .delete(&post.id)
        .await
        .expect("Failed to delete post");

    let comment = comment_repo.find_by_id(&comment.id).await.unwrap();
    assert!(comment.is_none(), "Comment survived post deletion");
    let review = review_repo.find_by_id(&review.id).await.unwrap();
    assert!(review.is_none(), "Review survived post deletion");

    db.drop_database().await.expect("Failed to drop database");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_post_block_toggle() {
    let (db, conn) = setup().await;
    let author = seed_user(&conn, "alice").await;
    let blocked = seed_user(&conn, "bob").await;
    let post = seed_post(&conn, &author.id, "release-notes").await;

    let repo = PostBlockRepository::new(Arc::clone(&conn));
    assert!(!repo.is_blocked(&post.id, &blocked.id).await.unwrap());

    repo.create(post_block::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        post_id: Set(post.id.clone()),
        user_id: Set(blocked.id.clone()),
        created_at: Set(now()),
    })
    .await
    .expect("Failed to create block");
    assert!(repo.is_blocked(&post.id, &blocked.id).await.unwrap());

    let removed = repo.delete_by_pair(&post.id, &blocked.id).await.unwrap();
    assert_eq!(removed, 1);
    assert!(!repo.is_blocked(&post.id, &blocked.id).await.unwrap());

    let removed = repo.delete_by_pair(&post.id, &blocked.id).await.unwrap();
    assert_eq!(removed, 0);

    db.drop_database().await.expect("Failed to drop database");
}

#[test]
fn test_config_from_env() {
    // Test that default config is valid
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
