//! Turns inbound requests into notifications and emails.

use async_trait::async_trait;
use std::sync::Arc;
use stream_worker::{MessageHandler, StreamError};
use tracing::{info, warn};

use crate::error::{NotificationError, NotificationResult};
use crate::models::{Notification, NotificationRequest, PasswordResetRequest, RegistrationRequest};
use crate::repository::NotificationRepository;
use crate::sender::EmailSender;
use crate::service::NotificationService;

/// Interpret a stream payload. First match wins:
///
/// 1. JSON object with a non-blank `email` (and optional string `user_id`) → password reset
/// 2. JSON object with a non-blank `email` (and optional string `username`) → registration
/// 3. The payload itself, as trimmed text, if non-empty → registration for that address
///
/// Both JSON shapes accept `{"email": ...}`, so the second only matches when
/// the first fails to parse, e.g. `{"email": "a@x.com", "user_id": 7}`.
/// Addresses are trimmed, so no rule yields an empty one.
pub fn classify(payload: &[u8]) -> NotificationResult<NotificationRequest> {
    if let Ok(req) = serde_json::from_slice::<PasswordResetRequest>(payload)
        && !req.email.trim().is_empty()
    {
        let email = req.email.trim().to_string();
        return Ok(PasswordResetRequest { email, ..req }.into());
    }

    if let Ok(req) = serde_json::from_slice::<RegistrationRequest>(payload)
        && !req.email.trim().is_empty()
    {
        let email = req.email.trim().to_string();
        return Ok(RegistrationRequest { email, ..req }.into());
    }

    let raw = String::from_utf8_lossy(payload);
    let email = raw.trim();
    if !email.is_empty() {
        return Ok(NotificationRequest::Registration {
            email: email.to_string(),
            username: None,
        });
    }

    Err(NotificationError::Classification(format!(
        "payload {:?} is neither a known request nor an email address",
        raw
    )))
}

/// Runs the create → send → mark-sent flow for both the stream and HTTP paths.
pub struct NotificationDispatcher<R: NotificationRepository> {
    service: Arc<NotificationService<R>>,
    sender: Arc<dyn EmailSender>,
}

impl<R: NotificationRepository> Clone for NotificationDispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<R: NotificationRepository> NotificationDispatcher<R> {
    pub fn new(service: Arc<NotificationService<R>>, sender: Arc<dyn EmailSender>) -> Self {
        Self { service, sender }
    }

    pub fn service(&self) -> &NotificationService<R> {
        &self.service
    }

    /// Create a password reset code for `email`, mail it, then mark it sent.
    pub async fn issue_password_reset(&self, email: &str) -> NotificationResult<Notification> {
        let notification = self.service.create_password_reset_notification(email).await?;
        let code = notification.code.as_deref().ok_or_else(|| {
            NotificationError::CodeGeneration(format!(
                "password reset {} has no code",
                notification.id
            ))
        })?;

        self.sender.send_password_reset_email(email, code).await?;
        self.mark_sent(&notification).await;

        info!(email = %email, notification_id = %notification.id, "Password reset code sent");
        Ok(notification)
    }

    /// Record a registration for `email`, mail the confirmation, then mark it sent.
    pub async fn issue_registration(&self, email: &str) -> NotificationResult<Notification> {
        let notification = self.service.create_registration_notification(email).await?;

        self.sender.send_registration_email(email).await?;
        self.mark_sent(&notification).await;

        info!(email = %email, notification_id = %notification.id, "Registration confirmation sent");
        Ok(notification)
    }

    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
    ) -> NotificationResult<Notification> {
        match request {
            NotificationRequest::PasswordReset { email, .. } => {
                self.issue_password_reset(email).await
            }
            NotificationRequest::Registration { email, .. } => {
                self.issue_registration(email).await
            }
        }
    }

    /// The email already went out, so a failure here is only logged.
    async fn mark_sent(&self, notification: &Notification) {
        if let Err(e) = self.service.mark_notification_as_sent(&notification.id).await {
            warn!(
                notification_id = %notification.id,
                error = %e,
                "Failed to mark notification as sent"
            );
        }
    }
}

#[async_trait]
impl<R: NotificationRepository + 'static> MessageHandler for NotificationDispatcher<R> {
    async fn handle(&self, payload: &[u8]) -> Result<(), StreamError> {
        let request = classify(payload)?;
        info!(kind = %request.kind(), email = %request.email(), "Classified stream message");
        self.dispatch(&request).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationDispatcher"
    }
}
