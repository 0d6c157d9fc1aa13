//! Outbound email capability used by the dispatcher.

use async_trait::async_trait;
use tracing::info;

use crate::error::{NotificationError, NotificationResult};
use crate::providers::{EmailContent, EmailProvider};
use crate::templates::{RenderedEmail, TemplateEngine};

/// Sends the two kinds of notification email.
///
/// Any failure is reported as [`NotificationError::Delivery`]. No timeout is
/// applied here; wrap the call if bounded latency matters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_password_reset_email(&self, email: &str, code: &str) -> NotificationResult<()>;

    async fn send_registration_email(&self, email: &str) -> NotificationResult<()>;
}

/// Renders messages with [`TemplateEngine`] and hands them to an [`EmailProvider`].
pub struct MailerEmailSender<P: EmailProvider> {
    provider: P,
    templates: TemplateEngine,
}

impl<P: EmailProvider> MailerEmailSender<P> {
    pub fn new(provider: P) -> NotificationResult<Self> {
        Ok(Self {
            provider,
            templates: TemplateEngine::new()?,
        })
    }

    async fn deliver(&self, to: &str, rendered: RenderedEmail) -> NotificationResult<()> {
        let content = EmailContent {
            to_email: to.to_string(),
            from_name: Some(rendered.sender_name),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        };

        let sent = self
            .provider
            .send(&content)
            .await
            .map_err(|e| match e {
                NotificationError::Delivery(_) => e,
                other => NotificationError::Delivery(other.to_string()),
            })?;

        if !sent.accepted {
            return Err(NotificationError::Delivery(format!(
                "{} did not accept the message for {}",
                self.provider.name(),
                to
            )));
        }

        info!(
            to = %to,
            provider = self.provider.name(),
            message_id = ?sent.message_id,
            "Notification email delivered"
        );
        Ok(())
    }
}

#[async_trait]
impl<P: EmailProvider> EmailSender for MailerEmailSender<P> {
    async fn send_password_reset_email(&self, email: &str, code: &str) -> NotificationResult<()> {
        let rendered = self
            .templates
            .render_password_reset(code)
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        self.deliver(email, rendered).await
    }

    async fn send_registration_email(&self, email: &str) -> NotificationResult<()> {
        let rendered = self
            .templates
            .render_registration(email)
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        self.deliver(email, rendered).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockEmailProvider, SentEmail};

    fn accepted() -> SentEmail {
        SentEmail {
            message_id: Some("queued as 42".to_string()),
            accepted: true,
        }
    }

    #[tokio::test]
    async fn test_password_reset_email_content() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|c| {
                c.to_email == "a@x.com"
                    && c.subject == "Password Reset Code"
                    && c.from_name.as_deref() == Some("Password Reset")
                    && c.text_body
                        == "Your password reset code is: 1234\nThis code will expire in 10 minutes."
            })
            .times(1)
            .returning(|_| Ok(accepted()));
        provider.expect_name().return_const("mock");

        let sender = MailerEmailSender::new(provider).unwrap();
        sender.send_password_reset_email("a@x.com", "1234").await.unwrap();
    }

    #[tokio::test]
    async fn test_registration_email_content() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|c| {
                c.subject == "Welcome to Four-X: Registration Successful!"
                    && c.from_name.as_deref() == Some("Four-X Registration")
            })
            .times(1)
            .returning(|_| Ok(accepted()));
        provider.expect_name().return_const("mock");

        let sender = MailerEmailSender::new(provider).unwrap();
        sender.send_registration_email("b@x.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_provider_failure_is_delivery_error() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .returning(|_| Err(NotificationError::InvalidEmail("bad".to_string())));
        provider.expect_name().return_const("mock");

        let sender = MailerEmailSender::new(provider).unwrap();
        let err = sender.send_registration_email("bad").await.unwrap_err();
        assert!(matches!(err, NotificationError::Delivery(msg) if msg.contains("bad")));
    }

    #[tokio::test]
    async fn test_rejected_message_is_delivery_error() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().returning(|_| {
            Ok(SentEmail {
                message_id: None,
                accepted: false,
            })
        });
        provider.expect_name().return_const("mock");

        let sender = MailerEmailSender::new(provider).unwrap();
        let err = sender.send_registration_email("b@x.com").await.unwrap_err();
        assert!(matches!(err, NotificationError::Delivery(_)));
    }
}
