//! API Module
//!
//! HTTP handlers and routing for the gateway.
//!
//! # Endpoints
//! - `POST /set` - Write a batch of entries
//! - `GET /get?key=` - Read one entry
//! - `DELETE /delete?pattern=` - Purge entries matching a pattern
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
