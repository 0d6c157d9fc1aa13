//! Data models for the notifications domain.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Notification Entity
// ============================================================================

/// Lifetime of a password reset code, in minutes.
pub const PASSWORD_RESET_TTL_MINUTES: i64 = 10;

/// Lifetime of a registration notification, in hours.
pub const REGISTRATION_TTL_HOURS: i64 = 24;

/// Kind of notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Carries a 4-digit code; at most one active per email.
    PasswordReset,
    /// Confirmation that registration succeeded.
    Registration,
}

impl NotificationKind {
    /// How long a notification of this kind stays valid.
    pub fn ttl(self) -> Duration {
        match self {
            NotificationKind::PasswordReset => Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
            NotificationKind::Registration => Duration::hours(REGISTRATION_TTL_HOURS),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::PasswordReset => write!(f, "password_reset"),
            NotificationKind::Registration => write!(f, "registration"),
        }
    }
}

/// A record of an intent to deliver a code or confirmation to an address.
///
/// `id`, `email`, `code` and both timestamps never change after creation.
/// `sent` only ever goes from `false` to `true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub email: String,
    /// Present only for password resets.
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sent: bool,
}

impl Notification {
    /// Create a notification stamped with `created_at`.
    pub fn new_at(
        kind: NotificationKind,
        email: impl Into<String>,
        code: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            email: email.into(),
            code,
            created_at,
            expires_at: created_at + kind.ttl(),
            sent: false,
        }
    }

    /// New password reset notification carrying `code`, expiring in 10 minutes.
    pub fn password_reset(email: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new_at(NotificationKind::PasswordReset, email, Some(code.into()), Utc::now())
    }

    /// New registration notification, expiring in 24 hours.
    pub fn registration(email: impl Into<String>) -> Self {
        Self::new_at(NotificationKind::Registration, email, None, Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Neither sent nor expired.
    pub fn is_active(&self) -> bool {
        !self.sent && !self.is_expired()
    }

    pub fn is_password_reset(&self) -> bool {
        self.kind == NotificationKind::PasswordReset
    }
}

// ============================================================================
// Stream Request Shapes
// ============================================================================

/// Password reset request as published on the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordResetRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Registration request as published on the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// What an inbound stream payload asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRequest {
    PasswordReset {
        email: String,
        user_id: Option<String>,
    },
    Registration {
        email: String,
        username: Option<String>,
    },
}

impl NotificationRequest {
    pub fn email(&self) -> &str {
        match self {
            NotificationRequest::PasswordReset { email, .. }
            | NotificationRequest::Registration { email, .. } => email,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationRequest::PasswordReset { .. } => NotificationKind::PasswordReset,
            NotificationRequest::Registration { .. } => NotificationKind::Registration,
        }
    }
}

impl From<PasswordResetRequest> for NotificationRequest {
    fn from(req: PasswordResetRequest) -> Self {
        NotificationRequest::PasswordReset {
            email: req.email,
            user_id: req.user_id,
        }
    }
}

impl From<RegistrationRequest> for NotificationRequest {
    fn from(req: RegistrationRequest) -> Self {
        NotificationRequest::Registration {
            email: req.email,
            username: req.username,
        }
    }
}

// ============================================================================
// HTTP DTOs
// ============================================================================

/// Body of `POST /forgot`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub status: String,
}

impl ForgotPasswordResponse {
    pub fn success() -> Self {
        Self {
            message: "Password reset code has been sent to your email".to_string(),
            status: "success".to_string(),
        }
    }
}

/// Body of `POST /validate`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ValidateCodeRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidateCodeResponse {
    pub valid: bool,
    pub message: String,
}

impl ValidateCodeResponse {
    pub fn new(valid: bool) -> Self {
        Self {
            valid,
            message: "Code validation completed".to_string(),
        }
    }
}
