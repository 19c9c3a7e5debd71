//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_table;
mod m20250601_000002_create_post_table;
mod m20250601_000003_create_tag_tables;
mod m20250601_000004_create_comment_table;
mod m20250601_000005_create_review_table;
mod m20250601_000006_create_vote_tables;
mod m20250601_000007_create_reaction_table;
mod m20250601_000008_create_post_block_table;
mod m20250601_000009_create_notification_table;
mod m20250601_000010_create_notification_block_table;
mod m20250601_000011_create_subscription_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_table::Migration),
            Box::new(m20250601_000002_create_post_table::Migration),
            Box::new(m20250601_000003_create_tag_tables::Migration),
            Box::new(m20250601_000004_create_comment_table::Migration),
            Box::new(m20250601_000005_create_review_table::Migration),
            Box::new(m20250601_000006_create_vote_tables::Migration),
            Box::new(m20250601_000007_create_reaction_table::Migration),
            Box::new(m20250601_000008_create_post_block_table::Migration),
            Box::new(m20250601_000009_create_notification_table::Migration),
            Box::new(m20250601_000010_create_notification_block_table::Migration),
            Box::new(m20250601_000011_create_subscription_table::Migration),
        ]
    }
}
