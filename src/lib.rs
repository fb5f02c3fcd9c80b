//! Cache Gateway - an HTTP front for a Redis-compatible store
//!
//! Batch writes with a fixed expiry, single-key reads, and pattern purges
//! driven by a scan cursor, all over one shared store connection.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use store::{KvStore, StoreEndpoint};
