//! JSON extractor with automatic validation using the validator crate.

use crate::errors::AppError;
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor that runs `Validate::validate` on the decoded body.
///
/// Malformed JSON is rejected with the axum rejection status; a body that
/// fails validation is rejected with 400 and per-field details.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct ForgotPassword {
///     #[validate(email)]
///     email: String,
/// }
///
/// async fn forgot(ValidatedJson(body): ValidatedJson<ForgotPassword>) -> String {
///     body.email
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        data.validate()
            .map_err(|e| AppError::from(e).into_response())?;

        Ok(ValidatedJson(data))
    }
}
