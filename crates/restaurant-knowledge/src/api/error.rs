//! Mapping of crate errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// Error returned by API handlers.
///
/// Client errors carry their own message. Server errors log the detail and
/// answer with `failure` only.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// A 400 with `message`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Classify `err`; `failure` is the user-visible text for a 500.
    #[must_use]
    pub fn from_error(err: &Error, failure: &str) -> Self {
        let (status, message) = match err {
            Error::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "Restaurant not found".to_string()),
            Error::Conflict { .. } => (
                StatusCode::CONFLICT,
                "The collection was changed by someone else; reload and try again".to_string(),
            ),
            _ => {
                error!("{failure}: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
            }
        };
        Self { status, message }
    }

    /// HTTP status of this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Attach the 500 message to a fallible operation.
pub(crate) trait OrFailure<T> {
    fn or_failure(self, failure: &str) -> Result<T, ApiError>;
}

impl<T> OrFailure<T> for crate::error::Result<T> {
    fn or_failure(self, failure: &str) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::from_error(&err, failure))
    }
}
