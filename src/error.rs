//! Error types for the query client and its HTTP surface
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use thiserror::Error;

use crate::models::ErrorResponse;

// == Query Error Enum ==
/// Failure of a remote query, as seen by report endpoints.
///
/// `Clone` so that one coalesced token refresh can hand the same outcome to
/// every waiting caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Credentials were rejected, or a freshly issued token was rejected again
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The upstream rejected the bearer token (HTTP 401)
    #[error("Unauthorized: upstream rejected the access token")]
    Unauthorized,

    /// The remote call exceeded its time budget
    #[error("Query timed out: {0}")]
    Timeout(String),

    /// Any other upstream failure: 5xx, transport error, malformed payload
    #[error("Remote failure: {0}")]
    RemoteFailure(String),
}

impl QueryError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::AuthenticationFailed(_) => "authentication_failed",
            QueryError::Unauthorized => "unauthorized",
            QueryError::Timeout(_) => "timeout",
            QueryError::RemoteFailure(_) => "remote_failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

// == API Error Enum ==
/// Error returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A remote query failed
    #[error("{source}")]
    Query {
        source: QueryError,
        /// Whether the underlying message may be shown to the client
        expose_details: bool,
    },
}

impl ApiError {
    /// Wraps a query failure. Details are hidden when running in production.
    pub fn query(source: QueryError, production: bool) -> Self {
        ApiError::Query {
            source,
            expose_details: !production,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("invalid_request", Some(msg.clone())),
            ),
            ApiError::Query {
                source,
                expose_details,
            } => (
                source.status_code(),
                ErrorResponse::new(source.kind(), expose_details.then(|| source.to_string())),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
