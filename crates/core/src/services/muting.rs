//! Muting service.

use chrono::Utc;
use gazette_common::{AppError, AppResult, IdGenerator};
use gazette_db::{
    entities::{notification_block, user},
    repositories::{NotificationBlockRepository, UserRepository},
};
use sea_orm::Set;

/// Muting service for business logic.
///
/// A mute suppresses future notifications caused by the muted user. It never
/// touches that user's content.
#[derive(Clone)]
pub struct MutingService {
    notification_block_repo: NotificationBlockRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl MutingService {
    /// Create a new muting service.
    #[must_use]
    pub const fn new(
        notification_block_repo: NotificationBlockRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            notification_block_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Mute a user. Muting someone already muted returns the existing row.
    pub async fn mute(
        &self,
        blocker_id: &str,
        muted_user_id: &str,
    ) -> AppResult<notification_block::Model> {
        // Cannot mute yourself
        if blocker_id == muted_user_id {
            return Err(AppError::BadRequest("Cannot mute yourself".to_string()));
        }

        // Check if target exists
        self.user_repo.get_by_id(muted_user_id).await?;

        // Already muting
        if let Some(existing) = self
            .notification_block_repo
            .find_by_pair(blocker_id, muted_user_id)
            .await?
        {
            return Ok(existing);
        }

        let model = notification_block::ActiveModel {
            id: Set(self.id_gen.generate()),
            blocker_id: Set(blocker_id.to_string()),
            blocked_user_id: Set(muted_user_id.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        };

        match self.notification_block_repo.create(model).await {
            Ok(created) => Ok(created),
            // Concurrent mute of the same pair; take the winner's row.
            Err(AppError::Conflict(_)) => self
                .notification_block_repo
                .find_by_pair(blocker_id, muted_user_id)
                .await?
                .ok_or_else(|| AppError::Conflict("Mute changed concurrently".to_string())),
            Err(e) => Err(e),
        }
    }

    /// Unmute a user. Unmuting someone not muted is a no-op.
    pub async fn unmute(&self, blocker_id: &str, muted_user_id: &str) -> AppResult<()> {
        self.notification_block_repo
            .delete_by_pair(blocker_id, muted_user_id)
            .await?;
        Ok(())
    }

    /// Check if a user has muted another user.
    pub async fn is_muting(&self, blocker_id: &str, muted_user_id: &str) -> AppResult<bool> {
        self.notification_block_repo
            .is_blocking(blocker_id, muted_user_id)
            .await
    }

    /// Get the users someone has muted.
    pub async fn list_muted(&self, blocker_id: &str) -> AppResult<Vec<user::Model>> {
        let blocks = self
            .notification_block_repo
            .find_by_blocker(blocker_id)
            .await?;

        let ids: Vec<String> = blocks.into_iter().map(|b| b.blocked_user_id).collect();

        self.user_repo.find_by_ids(&ids).await
    }
}
