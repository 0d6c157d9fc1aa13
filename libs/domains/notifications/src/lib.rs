//! Notifications Domain
//!
//! Issues short-lived verification codes (password reset, registration)
//! and delivers them by email.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐      ┌─────────────────┐
//! │  HTTP handlers  │      │  Stream worker  │  ← raw payload bytes
//! └────────┬────────┘      └────────┬────────┘
//!          │               ┌────────▼────────┐
//!          │               │   Dispatcher    │  ← classifies the payload
//!          │               └────────┬────────┘
//!          └───────────┬────────────┘
//!             ┌────────▼────────┐
//!             │ NotificationSvc │  ← codes, invalidation, expiry
//!             └───┬─────────┬───┘
//!   ┌─────────────▼──┐   ┌──▼──────────────┐
//!   │   Repository   │   │   EmailSender   │  ← handlebars + SMTP
//!   └────────────────┘   └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{
//!     InMemoryNotificationRepository, MailerEmailSender, NotificationDispatcher,
//!     NotificationService, providers::{SmtpConfig, SmtpProvider},
//! };
//!
//! let service = Arc::new(NotificationService::new(InMemoryNotificationRepository::new()));
//! let provider = SmtpProvider::new(SmtpConfig::from_env()?)?;
//! let sender = Arc::new(MailerEmailSender::new(provider)?);
//! let dispatcher = Arc::new(NotificationDispatcher::new(service, sender));
//!
//! // Stream path
//! let worker = StreamWorker::new(source, dispatcher.clone(), config);
//!
//! // HTTP path
//! let api = handlers::router(dispatcher);
//! ```

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod repository;
pub mod sender;
pub mod service;
pub mod templates;

pub use dispatcher::{NotificationDispatcher, classify};
pub use error::{NotificationError, NotificationResult};
pub use models::{
    ForgotPasswordRequest, ForgotPasswordResponse, Notification, NotificationKind,
    NotificationRequest, PasswordResetRequest, RegistrationRequest, ValidateCodeRequest,
    ValidateCodeResponse,
};
pub use providers::{EmailContent, EmailProvider, SentEmail, SmtpConfig, SmtpProvider};
pub use repository::{InMemoryNotificationRepository, NotificationRepository};
pub use sender::{EmailSender, MailerEmailSender};
pub use service::NotificationService;
pub use templates::{RenderedEmail, TemplateEngine};
