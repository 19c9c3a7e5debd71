//! Create review table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Review::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Review::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Review::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Review::ParentId).string_len(32))
                    .col(ColumnDef::new(Review::Rating).small_integer())
                    .col(ColumnDef::new(Review::Body).text().not_null())
                    .col(ColumnDef::new(Review::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Review::Pinned).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Review::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_post")
                            .from(Review::Table, Review::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_user")
                            .from(Review::Table, Review::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_parent")
                            .from(Review::Table, Review::ParentId)
                            .to(Review::Table, Review::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: post_id (for listing a post's reviews)
        manager
            .create_index(
                Index::create()
                    .name("idx_review_post_id")
                    .table(Review::Table)
                    .col(Review::PostId)
                    .to_owned(),
            )
            .await?;

        // Index: parent_id (for reply lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_review_parent_id")
                    .table(Review::Table)
                    .col(Review::ParentId)
                    .to_owned(),
            )
            .await?;

        // One root review per (post, user); replies are unconstrained
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_review_root_per_user
                ON review (post_id, user_id)
                WHERE parent_id IS NULL;
                ",
            )
            .await?;

        // Root reviews must carry a rating; ratings stay in 1..=5
        manager
            .get_connection()
            .execute_unprepared(
                r"
                ALTER TABLE review DROP CONSTRAINT IF EXISTS chk_review_rating_presence;
                ALTER TABLE review ADD CONSTRAINT chk_review_rating_presence
                    CHECK (rating IS NOT NULL OR parent_id IS NOT NULL);
                ALTER TABLE review DROP CONSTRAINT IF EXISTS chk_review_rating_range;
                ALTER TABLE review ADD CONSTRAINT chk_review_rating_range
                    CHECK (rating IS NULL OR (rating >= 1 AND rating <= 5));
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Review::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Review {
    Table,
    Id,
    PostId,
    UserId,
    ParentId,
    Rating,
    Body,
    Status,
    Pinned,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
