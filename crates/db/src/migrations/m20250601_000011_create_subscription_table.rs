//! Create subscription table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscription::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscription::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscription::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Subscription::AuthorId).string_len(32))
                    .col(ColumnDef::new(Subscription::TagId).string_len(32))
                    .col(
                        ColumnDef::new(Subscription::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_user")
                            .from(Subscription::Table, Subscription::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_author")
                            .from(Subscription::Table, Subscription::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_tag")
                            .from(Subscription::Table, Subscription::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for listing a user's subscriptions)
        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_user_id")
                    .table(Subscription::Table)
                    .col(Subscription::UserId)
                    .to_owned(),
            )
            .await?;

        // Exactly one of author_id/tag_id; one subscription per target per user
        manager
            .get_connection()
            .execute_unprepared(
                r"
                ALTER TABLE subscription DROP CONSTRAINT IF EXISTS chk_subscription_single_target;
                ALTER TABLE subscription ADD CONSTRAINT chk_subscription_single_target
                    CHECK ((author_id IS NULL) <> (tag_id IS NULL));
                CREATE UNIQUE INDEX IF NOT EXISTS idx_subscription_user_author
                    ON subscription (user_id, author_id)
                    WHERE author_id IS NOT NULL;
                CREATE UNIQUE INDEX IF NOT EXISTS idx_subscription_user_tag
                    ON subscription (user_id, tag_id)
                    WHERE tag_id IS NOT NULL;
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscription::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Subscription {
    Table,
    Id,
    UserId,
    AuthorId,
    TagId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
}
