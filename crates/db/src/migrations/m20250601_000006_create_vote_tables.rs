//! Create comment_vote and review_vote tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommentVote::CommentId).string_len(32).not_null())
                    .col(ColumnDef::new(CommentVote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(CommentVote::Value).small_integer().not_null())
                    .col(
                        ColumnDef::new(CommentVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_vote_comment")
                            .from(CommentVote::Table, CommentVote::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_vote_user")
                            .from(CommentVote::Table, CommentVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (comment_id, user_id) - one vote per user per comment
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_vote_pair")
                    .table(CommentVote::Table)
                    .col(CommentVote::CommentId)
                    .col(CommentVote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Vote values are +1 or -1, neutral rows are deleted
        manager
            .get_connection()
            .execute_unprepared(
                r"
                ALTER TABLE comment_vote DROP CONSTRAINT IF EXISTS chk_comment_vote_value;
                ALTER TABLE comment_vote ADD CONSTRAINT chk_comment_vote_value
                    CHECK (value IN (-1, 1));
                ",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReviewVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReviewVote::ReviewId).string_len(32).not_null())
                    .col(ColumnDef::new(ReviewVote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(ReviewVote::Vote).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ReviewVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_vote_review")
                            .from(ReviewVote::Table, ReviewVote::ReviewId)
                            .to(Review::Table, Review::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_vote_user")
                            .from(ReviewVote::Table, ReviewVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (review_id, user_id) - one vote per user per review
        manager
            .create_index(
                Index::create()
                    .name("idx_review_vote_pair")
                    .table(ReviewVote::Table)
                    .col(ReviewVote::ReviewId)
                    .col(ReviewVote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReviewVote::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CommentVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommentVote {
    Table,
    Id,
    CommentId,
    UserId,
    Value,
    CreatedAt,
}

#[derive(Iden)]
enum ReviewVote {
    Table,
    Id,
    ReviewId,
    UserId,
    Vote,
    CreatedAt,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}

#[derive(Iden)]
enum Review {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
