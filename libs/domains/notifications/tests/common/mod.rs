#![allow(dead_code)]

use async_trait::async_trait;
use domain_notifications::{
    EmailSender, InMemoryNotificationRepository, NotificationDispatcher, NotificationError,
    NotificationResult, NotificationService,
};
use std::sync::{Arc, Mutex};

/// One email the fake sender was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    PasswordReset { email: String, code: String },
    Registration { email: String },
}

/// Records deliveries instead of talking to SMTP; fails for addresses in `failing`.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<Sent>>,
    pub failing: Vec<String>,
}

impl RecordingSender {
    pub fn failing_for(email: &str) -> Self {
        Self {
            failing: vec![email.to_string()],
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn check(&self, email: &str) -> NotificationResult<()> {
        if self.failing.iter().any(|f| f == email) {
            return Err(NotificationError::Delivery(format!("mailbox {} unavailable", email)));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send_password_reset_email(&self, email: &str, code: &str) -> NotificationResult<()> {
        self.check(email)?;
        self.sent.lock().unwrap().push(Sent::PasswordReset {
            email: email.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_registration_email(&self, email: &str) -> NotificationResult<()> {
        self.check(email)?;
        self.sent.lock().unwrap().push(Sent::Registration {
            email: email.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub repo: InMemoryNotificationRepository,
    pub sender: Arc<RecordingSender>,
    pub dispatcher: NotificationDispatcher<InMemoryNotificationRepository>,
}

pub fn harness_with(sender: RecordingSender) -> Harness {
    let repo = InMemoryNotificationRepository::new();
    let sender = Arc::new(sender);
    let service = Arc::new(NotificationService::new(repo.clone()));
    let dispatcher = NotificationDispatcher::new(service, sender.clone());
    Harness {
        repo,
        sender,
        dispatcher,
    }
}

pub fn harness() -> Harness {
    harness_with(RecordingSender::default())
}
