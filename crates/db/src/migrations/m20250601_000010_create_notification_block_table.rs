//! Create notification_block table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationBlock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationBlock::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationBlock::BlockerId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationBlock::BlockedUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationBlock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_block_blocker")
                            .from(NotificationBlock::Table, NotificationBlock::BlockerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_block_blocked")
                            .from(NotificationBlock::Table, NotificationBlock::BlockedUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (blocker_id, blocked_user_id) - one mute per pair
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_block_pair")
                    .table(NotificationBlock::Table)
                    .col(NotificationBlock::BlockerId)
                    .col(NotificationBlock::BlockedUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationBlock::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NotificationBlock {
    Table,
    Id,
    BlockerId,
    BlockedUserId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
