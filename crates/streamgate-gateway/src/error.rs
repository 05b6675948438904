//! Runtime error types.

use crate::backend::BackendError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use streamgate_kernel::response::{JSON_CONTENT_TYPE, ProxyReply};
use streamgate_kernel::{GatewayError, HttpMethod, ValidationError};
use thiserror::Error;

/// Gateway runtime errors.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no route matched '{0}'")]
    RouteNotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed(Vec<HttpMethod>),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rejected by filter: {1}")]
    Rejected(u16, String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("backend call timed out after {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Config(#[from] GatewayError),

    #[error("no staged configuration to deploy")]
    NothingStaged,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Map a filter rejection onto the error taxonomy.
    pub fn from_rejection(status: u16, message: String) -> Self {
        match status {
            401 => ProxyError::Unauthorized(message),
            403 => ProxyError::Forbidden(message),
            _ => ProxyError::Rejected(status, message),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::Forbidden(_) => StatusCode::FORBIDDEN,
            ProxyError::Rejected(status, _) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::FORBIDDEN)
            }
            ProxyError::Validation(_) | ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Backend(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::NothingStaged => StatusCode::CONFLICT,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::RouteNotFound(_) => "NOT_FOUND",
            ProxyError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ProxyError::Unauthorized(_) => "UNAUTHORIZED",
            ProxyError::Forbidden(_) => "FORBIDDEN",
            ProxyError::Rejected(..) => "REJECTED",
            ProxyError::Validation(_) => "BAD_REQUEST_PARAMETERS",
            ProxyError::InvalidRequest(_) => "INVALID_REQUEST",
            ProxyError::Backend(_) => "BACKEND_UNAVAILABLE",
            ProxyError::Timeout(_) => "INTEGRATION_TIMEOUT",
            ProxyError::Config(_) => "INVALID_CONFIGURATION",
            ProxyError::NothingStaged => "NOTHING_STAGED",
            ProxyError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn body(&self) -> serde_json::Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }

    /// Render as a proxy reply so response filters still see it.
    pub fn to_reply(&self) -> ProxyReply {
        ProxyReply {
            status: self.status().as_u16(),
            content_type: JSON_CONTENT_TYPE,
            body: self.body().to_string().into_bytes(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
