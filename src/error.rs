//! Error types for the gateway
//!
//! Store-call failures are `StoreError`; anything that reaches the HTTP layer
//! is a `GatewayError`, which always renders as a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;
use crate::protocol::ProtocolError;

// == Store Error ==
/// A failed call against the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport failure on the store connection
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The store sent bytes that are not valid RESP
    #[error("store protocol error: {0}")]
    Protocol(ProtocolError),

    /// The store answered with an error reply
    #[error("store replied with error: {0}")]
    Server(String),

    /// The store answered with a reply of the wrong shape
    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: &'static str, reply: String },

    /// The session is gone and will not come back
    #[error("store connection closed")]
    Closed,

    /// The connection string could not be used
    #[error("invalid store endpoint: {0}")]
    InvalidEndpoint(String),

    /// An expiry of zero seconds was requested
    #[error("expiry must be a positive number of seconds")]
    InvalidExpiry,
}

impl From<ProtocolError> for StoreError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(io) => StoreError::Io(io),
            other => StoreError::Protocol(other),
        }
    }
}

/// Convenience Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Gateway Error ==
/// Failure surfaced by an HTTP handler.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request body could not be interpreted
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Details stay in the log; the caller only learns that something failed.
        error!("request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal()),
        )
            .into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for handlers.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_is_generic_500() {
        let response = GatewayError::InvalidBody("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_protocol_io_maps_to_store_io() {
        let err: StoreError =
            ProtocolError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).into();
        assert!(matches!(err, StoreError::Io(_)));

        let err: StoreError = ProtocolError::TooDeep.into();
        assert!(matches!(err, StoreError::Protocol(_)));
    }
}
