use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{NotificationError, NotificationResult};
use crate::models::Notification;

/// Repository trait for Notification persistence
///
/// Each call is atomic with respect to the stored set. Sequences of calls
/// are not; the service layer serializes the ones that must be.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert or overwrite by id
    async fn save(&self, notification: Notification) -> NotificationResult<()>;

    /// Get a notification by ID
    async fn get_by_id(&self, id: &str) -> NotificationResult<Notification>;

    /// All notifications for an email, in no particular order
    async fn get_by_email(&self, email: &str) -> NotificationResult<Vec<Notification>>;

    /// Notifications that are neither sent nor expired
    async fn get_pending(&self) -> NotificationResult<Vec<Notification>>;

    /// Set `sent`; calling it again is a no-op
    async fn mark_as_sent(&self, id: &str) -> NotificationResult<()>;

    /// Remove everything whose expiry is in the past, returning how many went
    async fn delete_expired(&self) -> NotificationResult<usize>;
}

/// In-memory implementation of NotificationRepository
///
/// State is lost on restart. Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<HashMap<String, Notification>>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self {
            notifications: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notifications.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: Notification) -> NotificationResult<()> {
        if notification.id.is_empty() {
            return Err(NotificationError::Repository(
                "notification id must not be empty".to_string(),
            ));
        }

        let mut notifications = self.notifications.write().await;
        notifications.insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> NotificationResult<Notification> {
        let notifications = self.notifications.read().await;
        notifications
            .get(id)
            .cloned()
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))
    }

    async fn get_by_email(&self, email: &str) -> NotificationResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .values()
            .filter(|n| n.email == email)
            .cloned()
            .collect())
    }

    async fn get_pending(&self) -> NotificationResult<Vec<Notification>> {
        let now = Utc::now();
        let notifications = self.notifications.read().await;
        Ok(notifications
            .values()
            .filter(|n| !n.sent && !n.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn mark_as_sent(&self, id: &str) -> NotificationResult<()> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .get_mut(id)
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))?;
        notification.sent = true;
        Ok(())
    }

    async fn delete_expired(&self) -> NotificationResult<usize> {
        let now = Utc::now();
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|_, n| n.expires_at >= now);
        let removed = before - notifications.len();

        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = notifications.len(),
                "Deleted expired notifications"
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use chrono::Duration;

    fn expired_reset(email: &str) -> Notification {
        Notification::new_at(
            NotificationKind::PasswordReset,
            email,
            Some("9999".to_string()),
            Utc::now() - Duration::minutes(11),
        )
    }

    #[tokio::test]
    async fn test_save_and_get_by_id() {
        let repo = InMemoryNotificationRepository::new();
        let n = Notification::password_reset("a@x.com", "1234");
        repo.save(n.clone()).await.unwrap();

        let fetched = repo.get_by_id(&n.id).await.unwrap();
        assert_eq!(fetched, n);
    }

    #[tokio::test]
    async fn test_save_overwrites_by_id() {
        let repo = InMemoryNotificationRepository::new();
        let mut n = Notification::password_reset("a@x.com", "1234");
        repo.save(n.clone()).await.unwrap();

        n.sent = true;
        repo.save(n.clone()).await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert!(repo.get_by_id(&n.id).await.unwrap().sent);
    }

    #[tokio::test]
    async fn test_save_rejects_empty_id() {
        let repo = InMemoryNotificationRepository::new();
        let mut n = Notification::registration("a@x.com");
        n.id = String::new();

        let err = repo.save(n).await.unwrap_err();
        assert!(matches!(err, NotificationError::Repository(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let repo = InMemoryNotificationRepository::new();
        let err = repo.get_by_id("missing").await.unwrap_err();
        assert!(matches!(err, NotificationError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_get_by_email_filters() {
        let repo = InMemoryNotificationRepository::new();
        repo.save(Notification::registration("a@x.com")).await.unwrap();
        repo.save(Notification::password_reset("a@x.com", "1111")).await.unwrap();
        repo.save(Notification::registration("b@x.com")).await.unwrap();

        let found = repo.get_by_email("a@x.com").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.email == "a@x.com"));
        assert!(repo.get_by_email("nobody@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_pending_skips_sent_and_expired() {
        let repo = InMemoryNotificationRepository::new();
        let active = Notification::password_reset("a@x.com", "1111");
        let mut sent = Notification::password_reset("a@x.com", "2222");
        sent.sent = true;

        repo.save(active.clone()).await.unwrap();
        repo.save(sent).await.unwrap();
        repo.save(expired_reset("a@x.com")).await.unwrap();

        let pending = repo.get_pending().await.unwrap();
        assert_eq!(pending, vec![active]);
    }

    #[tokio::test]
    async fn test_mark_as_sent_is_idempotent() {
        let repo = InMemoryNotificationRepository::new();
        let n = Notification::password_reset("a@x.com", "1234");
        repo.save(n.clone()).await.unwrap();

        repo.mark_as_sent(&n.id).await.unwrap();
        let once = repo.get_by_id(&n.id).await.unwrap();
        repo.mark_as_sent(&n.id).await.unwrap();
        let twice = repo.get_by_id(&n.id).await.unwrap();

        assert!(once.sent);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_mark_as_sent_not_found() {
        let repo = InMemoryNotificationRepository::new();
        let err = repo.mark_as_sent("missing").await.unwrap_err();
        assert!(matches!(err, NotificationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_expired_removes_only_expired() {
        let repo = InMemoryNotificationRepository::new();
        let live = Notification::password_reset("a@x.com", "1234");
        let old = expired_reset("a@x.com");
        repo.save(live.clone()).await.unwrap();
        repo.save(old.clone()).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&live.id).await.is_ok());
        assert!(repo.get_by_id(&old.id).await.is_err());

        // nothing left to sweep
        assert_eq!(repo.delete_expired().await.unwrap(), 0);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let repo = InMemoryNotificationRepository::new();
        let other = repo.clone();
        repo.save(Notification::registration("a@x.com")).await.unwrap();
        assert_eq!(other.len().await, 1);
    }
}
