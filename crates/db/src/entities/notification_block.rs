//! Notification block entity (pairwise notification mute).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_block")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who opted out
    #[sea_orm(indexed)]
    pub blocker_id: String,

    /// The actor whose events are suppressed
    #[sea_orm(indexed)]
    pub blocked_user_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BlockerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Blocker,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BlockedUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    BlockedUser,
}

impl ActiveModelBehavior for ActiveModel {}
