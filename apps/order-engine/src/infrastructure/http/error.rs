//! Mapping of engine errors onto HTTP responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::errors::{EngineError, ErrorKind};

use super::response::ErrorResponse;

/// An error leaving an HTTP handler.
#[derive(Debug)]
pub enum ApiError {
    /// A use case failed.
    Engine(EngineError),
    /// The request body was not valid JSON for the endpoint.
    Body(JsonRejection),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

/// HTTP status for an error kind.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::DispatchFailed => StatusCode::ACCEPTED,
        ErrorKind::Cancelled | ErrorKind::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Body(rejection) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: ErrorKind::InvalidInput.code().to_string(),
                    message: rejection.body_text(),
                },
            ),
            Self::Engine(err) => {
                let kind = err.kind();
                let message = if kind == ErrorKind::Infrastructure {
                    tracing::error!(error = %err, "Request failed");
                    "internal error".to_string()
                } else {
                    err.to_string()
                };
                (
                    status_for(kind),
                    ErrorResponse {
                        error: kind.code().to_string(),
                        message,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
