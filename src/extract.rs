//! `ValidatedJson<T>` works like `axum::Json<T>` but also runs
//! `validator::Validate` on the body. Both malformed JSON and failed rules
//! come back as a 400 `{"error": ...}`.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(format!("Invalid request body: {}", rejection.body_text())))?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
