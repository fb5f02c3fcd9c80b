//! Request and Response models for the gateway API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{FetchQuery, PurgeQuery, SetRequest, DEFAULT_KEY, DEFAULT_VALUE};
pub use responses::{ErrorResponse, HealthResponse, WriteOutcomeResponse, WriteStatus};
