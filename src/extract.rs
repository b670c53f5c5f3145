use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

/// AppJson Extractor
///
/// Drop-in replacement for `axum::Json` on request bodies. Axum's own rejection answers
/// with a plain-text body and a status that depends on the failure (400 for syntax
/// errors, 415 for a missing content type, 422 for a missing or mistyped field). Routing
/// every one of those through `AppError::Validation` gives clients one contract for bad
/// input: status 400 with the usual `{"status", "message"}` body.
///
/// The message is axum's rejection text, which names the offending field when there is
/// one (e.g. "missing field `detail`").
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "rejected request body");
        AppError::Validation(rejection.body_text())
    }
}
