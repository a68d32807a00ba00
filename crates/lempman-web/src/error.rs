//! Mapping from domain errors to HTTP responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lempman_core::Error;
use lempman_notify::NotifyError;
use tracing::{error, warn};

use crate::ApiResponse;

/// An error ready to be sent to the client.
///
/// Client mistakes carry their own message. Server-side failures carry only
/// the short context string; the underlying error goes to the log.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 with `context` as the message
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
    }

    /// Classify a core error, using `context` for anything the client did not cause
    pub fn from_core(context: &str, err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => Self::bad_request(msg),
            Error::NotFound(msg) => Self::not_found(msg),
            Error::AlreadyExists(msg) => Self::new(StatusCode::CONFLICT, format!("{} already exists", msg)),
            Error::Unauthorized(msg) => Self::unauthorized(msg),
            Error::Forbidden(msg) => Self::forbidden(msg),
            Error::Upstream(msg) => {
                warn!("{}: {}", context, msg);
                Self::new(StatusCode::BAD_GATEWAY, context)
            }
            other => Self::internal(context, other),
        }
    }

    pub fn from_notify(context: &str, err: NotifyError) -> Self {
        match err {
            NotifyError::ConfigError(msg) => Self::bad_request(msg),
            NotifyError::NotConfigured => Self::bad_request(err.to_string()),
            NotifyError::Storage(e) => Self::from_core(context, e),
            upstream => {
                warn!("{}: {}", context, upstream);
                Self::new(StatusCode::BAD_GATEWAY, context)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

// Malformed bodies and query strings answer with the usual envelope
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Attach a failure context to domain results
pub trait Context<T> {
    fn context(self, context: &str) -> std::result::Result<T, ApiError>;
}

impl<T> Context<T> for lempman_core::Result<T> {
    fn context(self, context: &str) -> std::result::Result<T, ApiError> {
        self.map_err(|e| ApiError::from_core(context, e))
    }
}

impl<T> Context<T> for lempman_notify::Result<T> {
    fn context(self, context: &str) -> std::result::Result<T, ApiError> {
        self.map_err(|e| ApiError::from_notify(context, e))
    }
}
