//! Notification service: business rules spanning several repository calls.

use rand::{TryRngCore, rngs::OsRng};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{NotificationError, NotificationResult};
use crate::models::Notification;
use crate::repository::NotificationRepository;

/// Number of distinct codes (`0000`..=`9999`).
const CODE_SPACE: u32 = 10_000;

/// Largest multiple of `CODE_SPACE` that fits in a `u32`; draws at or above
/// it are rejected so every code is equally likely.
const CODE_ACCEPT_BELOW: u32 = u32::MAX - (u32::MAX % CODE_SPACE);

/// Service for issuing, validating and expiring notifications.
pub struct NotificationService<R: NotificationRepository> {
    repository: R,
    /// Serializes the read-invalidate-insert sequence of password resets.
    reset_lock: Mutex<()>,
}

impl<R: NotificationRepository> NotificationService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            reset_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Generate a 4-digit code from the operating system's secure random source.
    ///
    /// Fails with [`NotificationError::CodeGeneration`] if the source fails;
    /// there is no weaker fallback.
    pub fn generate_code() -> NotificationResult<String> {
        generate_code_with(&mut OsRng)
    }

    /// Issue a new password reset code for `email`.
    ///
    /// Every earlier, unexpired password reset for the same address is marked
    /// sent first, so only the newest code can validate. This is best-effort:
    /// if a later step fails, invalidations already written stay in effect.
    pub async fn create_password_reset_notification(
        &self,
        email: &str,
    ) -> NotificationResult<Notification> {
        ensure_email(email)?;
        let _guard = self.reset_lock.lock().await;

        let existing = self.repository.get_by_email(email).await?;
        let mut invalidated = 0usize;
        for mut previous in existing
            .into_iter()
            .filter(|n| n.is_password_reset() && !n.is_expired())
        {
            previous.sent = true;
            self.repository.save(previous).await?;
            invalidated += 1;
        }

        let code = Self::generate_code()?;
        let notification = Notification::password_reset(email, code);
        self.repository.save(notification.clone()).await?;

        info!(
            notification_id = %notification.id,
            email = %email,
            invalidated,
            "Created password reset notification"
        );
        Ok(notification)
    }

    /// Record a registration notification. No invalidation takes place.
    pub async fn create_registration_notification(
        &self,
        email: &str,
    ) -> NotificationResult<Notification> {
        ensure_email(email)?;

        let notification = Notification::registration(email);
        self.repository.save(notification.clone()).await?;

        info!(
            notification_id = %notification.id,
            email = %email,
            "Created registration notification"
        );
        Ok(notification)
    }

    pub async fn mark_notification_as_sent(&self, id: &str) -> NotificationResult<()> {
        self.repository.mark_as_sent(id).await
    }

    pub async fn get_notifications_by_email(
        &self,
        email: &str,
    ) -> NotificationResult<Vec<Notification>> {
        self.repository.get_by_email(email).await
    }

    pub async fn get_notification_by_id(&self, id: &str) -> NotificationResult<Notification> {
        self.repository.get_by_id(id).await
    }

    pub async fn get_pending_notifications(&self) -> NotificationResult<Vec<Notification>> {
        self.repository.get_pending().await
    }

    /// Sweep expired notifications. Never scheduled from inside the service.
    pub async fn cleanup_expired_notifications(&self) -> NotificationResult<usize> {
        let removed = self.repository.delete_expired().await?;
        debug!(removed, "Cleaned up expired notifications");
        Ok(removed)
    }

    /// A code is valid iff an unsent, unexpired password reset for `email`
    /// carries it. Read-only.
    pub async fn validate_password_reset_code(
        &self,
        email: &str,
        code: &str,
    ) -> NotificationResult<bool> {
        let notifications = self.repository.get_by_email(email).await?;
        let valid = notifications.iter().any(|n| {
            n.is_password_reset() && n.is_active() && n.code.as_deref() == Some(code)
        });

        debug!(email = %email, valid, "Validated password reset code");
        Ok(valid)
    }
}

fn ensure_email(email: &str) -> NotificationResult<()> {
    if email.trim().is_empty() {
        return Err(NotificationError::InvalidEmail(
            "email must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn generate_code_with<G: TryRngCore + ?Sized>(rng: &mut G) -> NotificationResult<String> {
    loop {
        let draw = rng
            .try_next_u32()
            .map_err(|e| NotificationError::CodeGeneration(e.to_string()))?;
        if draw < CODE_ACCEPT_BELOW {
            return Ok(format!("{:04}", draw % CODE_SPACE));
        }
    }
}
