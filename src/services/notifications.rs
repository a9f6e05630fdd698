use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{Notification, NotificationType, NotificationView};
use crate::store::Store;

/// In-app notifications. Creation happens only as a side effect of other workflows.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        related_business_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            notification_type,
            title: title.to_string(),
            message: message.to_string(),
            related_business_id,
            is_read: false,
            created_at: self.clock.now(),
        };
        self.store.insert_notification(&notification).await?;
        Ok(())
    }

    /// Like [`notify`](Self::notify), but a failure only gets logged.
    pub async fn notify_best_effort(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        related_business_id: Option<Uuid>,
    ) {
        if let Err(err) = self
            .notify(user_id, notification_type, title, message, related_business_id)
            .await
        {
            log::warn!("Failed to record {notification_type:?} notification for {user_id}: {err}");
        }
    }

    pub async fn list(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<NotificationView>, AppError> {
        Ok(self.store.list_notifications(user_id, unread_only).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(self.store.unread_notification_count(user_id).await?)
    }

    /// Returns false when the notification does not exist or belongs to someone else.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.store.mark_notification_read(notification_id, user_id).await?)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        Ok(self.store.mark_all_notifications_read(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, MemoryStore};
    use chrono::{Duration, Utc};

    #[actix_web::test]
    async fn read_state_is_scoped_to_the_recipient() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = NotificationService::new(store.clone(), clock.clone());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        service.notify(alice, NotificationType::Follower, "New Follower", "x", None).await.unwrap();
        clock.advance(Duration::seconds(1));
        service.notify(alice, NotificationType::Review, "New Review", "y", None).await.unwrap();
        service.notify(bob, NotificationType::Approval, "Business Approved", "z", None).await.unwrap();

        let listed = service.list(alice, false).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].notification.title, "New Review");
        assert_eq!(listed[0].notification.created_at, clock.now());

        assert!(!service.mark_read(listed[0].notification.id, bob).await.unwrap());
        assert!(service.mark_read(listed[0].notification.id, alice).await.unwrap());
        assert_eq!(service.unread_count(alice).await.unwrap(), 1);
        assert_eq!(service.list(alice, true).await.unwrap().len(), 1);

        assert_eq!(service.mark_all_read(alice).await.unwrap(), 1);
        assert_eq!(service.unread_count(alice).await.unwrap(), 0);
        assert_eq!(service.unread_count(bob).await.unwrap(), 1);
        assert!(!service.mark_read(Uuid::new_v4(), alice).await.unwrap());
    }
}
