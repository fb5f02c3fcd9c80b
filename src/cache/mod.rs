//! Cache Module
//!
//! The cache-access layer: batched writes with a fixed expiry, single-key
//! reads, and cursor-driven pattern deletion. Every component is built around
//! a shared store handle passed in by the caller.

mod reader;
mod sweeper;
mod writer;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use reader::PointReader;
pub use sweeper::{
    PatternDeleter, SweepOutcome, SweepPolicy, SweepReport, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE,
};
pub use writer::{BatchResult, BatchWriter, WriteOutcome};

// == Public Constants ==
/// Expiry applied to every write unless configured otherwise
pub const DEFAULT_TTL_SECS: u64 = 120;
