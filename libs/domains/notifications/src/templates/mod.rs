//! Email template rendering engine.
//!
//! This module provides Handlebars-based template rendering for emails.

use crate::error::NotificationResult;
use crate::models::PASSWORD_RESET_TTL_MINUTES;
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const PASSWORD_RESET_SUBJECT: &str = "Password Reset Code";
pub const PASSWORD_RESET_SENDER_NAME: &str = "Password Reset";
pub const REGISTRATION_SUBJECT: &str = "Welcome to Four-X: Registration Successful!";
pub const REGISTRATION_SENDER_NAME: &str = "Four-X Registration";

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
    /// Email subject line.
    pub subject: String,
    /// Display name of the sender.
    pub sender_name: String,
}

#[derive(Serialize)]
struct PasswordResetData<'a> {
    code: &'a str,
    expiry_minutes: i64,
}

#[derive(Serialize)]
struct RegistrationData<'a> {
    email: &'a str,
}

const TEMPLATES: [(&str, &str); 4] = [
    ("password_reset_html", PASSWORD_RESET_HTML_TEMPLATE),
    ("password_reset_text", PASSWORD_RESET_TEXT_TEMPLATE),
    ("registration_html", REGISTRATION_HTML_TEMPLATE),
    ("registration_text", REGISTRATION_TEXT_TEMPLATE),
];

/// Template engine for rendering email templates.
#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        for (name, source) in TEMPLATES {
            handlebars.register_template_string(name, source)?;
        }

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    /// Render a template with the given data.
    fn render<T: Serialize>(&self, template_name: &str, data: &T) -> NotificationResult<String> {
        Ok(self.handlebars.render(template_name, data)?)
    }

    /// Render the password reset email carrying `code`.
    pub fn render_password_reset(&self, code: &str) -> NotificationResult<RenderedEmail> {
        debug!("Rendering password reset email");

        let data = PasswordResetData {
            code,
            expiry_minutes: PASSWORD_RESET_TTL_MINUTES,
        };

        Ok(RenderedEmail {
            html: self.render("password_reset_html", &data)?,
            text: self.render("password_reset_text", &data)?,
            subject: PASSWORD_RESET_SUBJECT.to_string(),
            sender_name: PASSWORD_RESET_SENDER_NAME.to_string(),
        })
    }

    /// Render the registration confirmation email.
    pub fn render_registration(&self, email: &str) -> NotificationResult<RenderedEmail> {
        debug!(email = %email, "Rendering registration email");

        let data = RegistrationData { email };

        Ok(RenderedEmail {
            html: self.render("registration_html", &data)?,
            text: self.render("registration_text", &data)?,
            subject: REGISTRATION_SUBJECT.to_string(),
            sender_name: REGISTRATION_SENDER_NAME.to_string(),
        })
    }
}

// ============================================================================
// Email Templates
// ============================================================================

const PASSWORD_RESET_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Password Reset Code</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Password Reset Code
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0 0 24px 0; text-align: center;">
          Use the code below to reset your Four-X password.
        </p>
        <p style="color: #18181b; font-size: 36px; font-weight: 700; letter-spacing: 8px; margin: 0 0 24px 0; text-align: center;">
          {{code}}
        </p>
        <p style="color: #71717a; font-size: 14px; margin: 0; text-align: center;">
          This code will expire in {{expiry_minutes}} minutes.
        </p>
      </td>
    </tr>
    <tr>
      <td style="padding: 24px 0; text-align: center;">
        <p style="color: #a1a1aa; font-size: 11px; margin: 0;">
          If you didn't request a password reset, you can ignore this email.
        </p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const PASSWORD_RESET_TEXT_TEMPLATE: &str = r#"Your password reset code is: {{code}}
This code will expire in {{expiry_minutes}} minutes."#;

const REGISTRATION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Welcome to Four-X</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Registration Successful!
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0; text-align: center;">
          Thank you for registering with four-x.com. Your registration has been successfully completed.
        </p>
      </td>
    </tr>
    <tr>
      <td style="padding: 24px 0; text-align: center;">
        <p style="color: #a1a1aa; font-size: 11px; margin: 0;">
          This message was sent to {{email}}.
        </p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const REGISTRATION_TEXT_TEMPLATE: &str =
    "Thank you for registering with four-x.com. Your registration has been successfully completed.";
