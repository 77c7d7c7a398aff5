//! Error handling for the Trustlink server

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trustlink::TrustlinkError;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Machine readable code plus a human readable message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// Trustlink library error
    #[error("{0}")]
    Trustlink(#[from] TrustlinkError),

    /// Authentication error
    #[error("{0}")]
    Auth(String),

    /// Bad request error
    #[error("{0}")]
    BadRequest(String),

    /// Not found error
    #[error("{0}")]
    NotFound(String),

    /// An upstream service could not be reached
    #[error("{0}")]
    BadGateway(String),

    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Trustlink(err) => match err {
                TrustlinkError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                TrustlinkError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                TrustlinkError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                TrustlinkError::NotFound(_) => StatusCode::NOT_FOUND,
                TrustlinkError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Trustlink(err) => match err {
                TrustlinkError::InvalidArgument(_) => "bad_request",
                TrustlinkError::Unauthenticated(_) => "unauthorized",
                TrustlinkError::PermissionDenied(_) => "forbidden",
                TrustlinkError::NotFound(_) => "not_found",
                TrustlinkError::Conflict(_) => "conflict",
                TrustlinkError::Unavailable(_) => "service_unavailable",
                _ => "internal_server_error",
            },
            ServerError::Auth(_) => "unauthorized",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::NotFound(_) => "not_found",
            ServerError::BadGateway(_) => "bad_gateway",
            ServerError::Internal(_) => "internal_server_error",
        }
    }

    /// Message shown to the caller.
    ///
    /// Internal failures are logged in full but reported generically.
    fn public_message(&self) -> String {
        match self {
            ServerError::Trustlink(err) => match err {
                TrustlinkError::InvalidArgument(msg)
                | TrustlinkError::Unauthenticated(msg)
                | TrustlinkError::PermissionDenied(msg)
                | TrustlinkError::NotFound(msg)
                | TrustlinkError::Conflict(msg) => msg.clone(),
                TrustlinkError::Unavailable(_) => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            },
            ServerError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Helper function to create a bad request error
pub fn bad_request(message: &str) -> ServerError {
    ServerError::BadRequest(message.to_string())
}
