//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::ai::chat::ChatError;
use crate::ai::completion::CompletionError;

// Errors

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<ChatError>() {
            Some(ChatError::EmptyInput) => StatusCode::BAD_REQUEST,
            Some(ChatError::Busy) => StatusCode::CONFLICT,
            Some(ChatError::Completion(
                CompletionError::Configuration(_) | CompletionError::InvalidRequest(_),
            )) => StatusCode::INTERNAL_SERVER_ERROR,
            Some(ChatError::Completion(_)) => StatusCode::BAD_GATEWAY,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Always log the error
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::warn!("{}", self.0);
        }

        (status, format!("Something went wrong: {}", self.0)).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}
