//! Notification repository: the notification collaborator's persistence side.
//!
//! Delivery is out of scope; exactly one record is persisted per call.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::notifications;

/// Notification repository.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    db: DatabaseConnection,
}

impl NotificationRepository {
    /// Creates a new notification repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persists one notification record.
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<notifications::Model, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        notifications::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            user_id: Set(user_id),
            payload: Set(payload),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    /// Counts notifications for a user.
    ///
    /// # Errors
    ///
    /// Returns a database error if the lookup fails.
    pub async fn count_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<u64, DbErr> {
        notifications::Entity::find()
            .filter(notifications::Column::TenantId.eq(tenant_id))
            .filter(notifications::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
    }
}
