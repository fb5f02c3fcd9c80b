//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::WriteOutcome;

// == Write Status ==
/// Per-key result of a batch write as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "failed")]
    Failed,
}

/// One element of the POST /set response array.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcomeResponse {
    /// The key that was written
    pub key: String,
    /// Whether the store accepted the write
    pub status: WriteStatus,
}

impl From<&WriteOutcome> for WriteOutcomeResponse {
    fn from(outcome: &WriteOutcome) -> Self {
        Self {
            key: outcome.key.clone(),
            status: if outcome.is_ok() {
                WriteStatus::Ok
            } else {
                WriteStatus::Failed
            },
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the store answers a ping
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a healthy response with the current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    /// Creates an unhealthy response with the current timestamp
    pub fn unhealthy() -> Self {
        Self::with_status("unhealthy")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// The only error body the gateway ever sends.
    pub fn internal() -> Self {
        Self::new("Internal Server Error")
    }
}
