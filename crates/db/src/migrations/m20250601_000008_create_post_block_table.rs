//! Create post_block table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostBlock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostBlock::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostBlock::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(PostBlock::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PostBlock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_block_post")
                            .from(PostBlock::Table, PostBlock::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_block_user")
                            .from(PostBlock::Table, PostBlock::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (post_id, user_id) - block toggling relies on this
        manager
            .create_index(
                Index::create()
                    .name("idx_post_block_pair")
                    .table(PostBlock::Table)
                    .col(PostBlock::PostId)
                    .col(PostBlock::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostBlock::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PostBlock {
    Table,
    Id,
    PostId,
    UserId,
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
