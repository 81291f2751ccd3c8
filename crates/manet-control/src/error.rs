//! HTTP-facing error type (C11, §4.10).
//!
//! Every response — success or error — carries a `status` and a
//! human-readable `message`. This deliberately diverges from the teacher's
//! `strata-control::api::auth::ApiError`, which renders `{"error": message}`:
//! §4.10 requires both fields on every path, including errors, so the body
//! shape here is `{status, message}` instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self
                .status
                .canonical_reason()
                .unwrap_or("error")
                .to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<manet_types::ConfigError> for ApiError {
    fn from(err: manet_types::ConfigError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// §7's error table: `SolverUnavailable` is the only `ChannelError` variant
/// the control surface raises directly rather than recovering from locally.
impl From<manet_types::ChannelError> for ApiError {
    fn from(err: manet_types::ChannelError) -> Self {
        use manet_types::ChannelError;
        match err {
            ChannelError::SolverUnavailable(_) => ApiError::unavailable(err.to_string()),
            ChannelError::UnknownEntity(_) => ApiError::not_found(err.to_string()),
            ChannelError::InvalidRequest(_) => ApiError::bad_request(err.to_string()),
            ChannelError::PathComputeFailed(_) | ChannelError::Shaper { .. } | ChannelError::Transient(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}
