//! Error types for the notifications domain.

use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use stream_worker::StreamError;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// No notification with the given id.
    #[error("Notification not found: {0}")]
    NotFound(String),

    /// A repository operation failed.
    #[error("Repository error: {0}")]
    Repository(String),

    /// A stream payload matched none of the recognized request shapes.
    #[error("Unrecognized notification payload: {0}")]
    Classification(String),

    /// The email provider failed to deliver a message.
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// The secure random source failed.
    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Template rendering error.
    #[error("Template rendering error: {0}")]
    Template(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for NotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}

/// Convert NotificationError to AppError for standardized error responses
impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => {
                AppError::NotFound(format!("Notification {} not found", id))
            }
            NotificationError::InvalidEmail(msg) | NotificationError::Classification(msg) => {
                AppError::BadRequest(msg)
            }
            NotificationError::Delivery(msg) => AppError::DeliveryFailed(msg),
            NotificationError::Template(msg) => AppError::Template(msg),
            NotificationError::Repository(msg)
            | NotificationError::CodeGeneration(msg)
            | NotificationError::Config(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<NotificationError> for StreamError {
    fn from(err: NotificationError) -> Self {
        StreamError::handler(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_delivery_maps_to_500() {
        let response = NotificationError::Delivery("smtp down".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_email_maps_to_400() {
        let response = NotificationError::InvalidEmail("empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = NotificationError::NotFound("abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_into_stream_error_keeps_message() {
        let err: StreamError = NotificationError::Classification("payload was empty".into()).into();
        assert!(matches!(err, StreamError::Handler(_)));
        assert!(err.to_string().contains("payload was empty"));
    }
}
