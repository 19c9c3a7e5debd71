//! Notification block repository.

use std::sync::Arc;

use crate::entities::{NotificationBlock, notification_block};
use gazette_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    SqlErr,
};

/// Notification block repository for database operations.
#[derive(Clone)]
pub struct NotificationBlockRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationBlockRepository {
    /// Create a new notification block repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a mute by (blocker, blocked user) pair.
    pub async fn find_by_pair(
        &self,
        blocker_id: &str,
        blocked_user_id: &str,
    ) -> AppResult<Option<notification_block::Model>> {
        NotificationBlock::find()
            .filter(notification_block::Column::BlockerId.eq(blocker_id))
            .filter(notification_block::Column::BlockedUserId.eq(blocked_user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a recipient has muted an actor.
    pub async fn is_blocking(&self, blocker_id: &str, blocked_user_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_pair(blocker_id, blocked_user_id)
            .await?
            .is_some())
    }

    /// Create a mute. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(
        &self,
        model: notification_block::ActiveModel,
    ) -> AppResult<notification_block::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a mute by (blocker, blocked user) pair.
    pub async fn delete_by_pair(&self, blocker_id: &str, blocked_user_id: &str) -> AppResult<u64> {
        let result = NotificationBlock::delete_many()
            .filter(notification_block::Column::BlockerId.eq(blocker_id))
            .filter(notification_block::Column::BlockedUserId.eq(blocked_user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Get the mutes a user holds, newest first.
    pub async fn find_by_blocker(
        &self,
        blocker_id: &str,
    ) -> AppResult<Vec<notification_block::Model>> {
        NotificationBlock::find()
            .filter(notification_block::Column::BlockerId.eq(blocker_id))
            .order_by_desc(notification_block::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
