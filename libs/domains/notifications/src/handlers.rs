use axum::{Json, Router, extract::State, routing::post};
use axum_helpers::ValidatedJson;
use std::sync::Arc;

use crate::dispatcher::NotificationDispatcher;
use crate::error::NotificationResult;
use crate::models::{
    ForgotPasswordRequest, ForgotPasswordResponse, ValidateCodeRequest, ValidateCodeResponse,
};
use crate::repository::NotificationRepository;

/// Create the notifications router (`POST /forgot`, `POST /validate`)
pub fn router<R>(dispatcher: NotificationDispatcher<R>) -> Router
where
    R: NotificationRepository + 'static,
{
    Router::new()
        .route("/forgot", post(forgot_password))
        .route("/validate", post(validate_code))
        .with_state(Arc::new(dispatcher))
}

/// Issue a password reset code and email it. The code is never returned.
async fn forgot_password<R: NotificationRepository>(
    State(dispatcher): State<Arc<NotificationDispatcher<R>>>,
    ValidatedJson(input): ValidatedJson<ForgotPasswordRequest>,
) -> NotificationResult<Json<ForgotPasswordResponse>> {
    dispatcher.issue_password_reset(&input.email).await?;
    Ok(Json(ForgotPasswordResponse::success()))
}

/// Check a submitted code against the active one for the address
async fn validate_code<R: NotificationRepository>(
    State(dispatcher): State<Arc<NotificationDispatcher<R>>>,
    ValidatedJson(input): ValidatedJson<ValidateCodeRequest>,
) -> NotificationResult<Json<ValidateCodeResponse>> {
    let valid = dispatcher
        .service()
        .validate_password_reset_code(&input.email, &input.code)
        .await?;
    Ok(Json(ValidateCodeResponse::new(valid)))
}
