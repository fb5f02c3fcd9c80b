//! Store Module
//!
//! The command contract of the backing key-value store and its implementations:
//! a pipelined network session speaking RESP, and an embedded in-process store.

mod endpoint;
mod glob;
mod memory;
mod session;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{StoreError, StoreResult};

pub use endpoint::{RedisEndpoint, StoreEndpoint};
pub use glob::glob_match;
pub use memory::{spawn_reaper, MemoryStore, REAP_INTERVAL};
pub use session::StoreSession;

// == Expiry ==
/// Time-to-live attached to a write. Always at least one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry(u64);

impl Expiry {
    /// Creates an expiry of `secs` seconds, rejecting zero.
    pub fn from_secs(secs: u64) -> StoreResult<Self> {
        if secs == 0 {
            return Err(StoreError::InvalidExpiry);
        }
        Ok(Self(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// == Scan Cursor ==
/// Opaque position in a keyspace scan. Only the store interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanCursor(u64);

impl ScanCursor {
    /// The cursor that starts a sweep and signals its completion.
    pub const START: ScanCursor = ScanCursor(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_start(&self) -> bool {
        *self == Self::START
    }
}

/// One page of a keyspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next page; `START` once the sweep is complete
    pub cursor: ScanCursor,
    /// Keys on this page matching the pattern
    pub keys: Vec<String>,
}

impl Default for ScanCursor {
    fn default() -> Self {
        Self::START
    }
}

// == Store Contract ==
/// Commands the gateway issues against the backing store.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Writes `value` under `key`, expiring after `ttl`. Returns the status reply.
    async fn set_ex(&self, key: &str, value: &str, ttl: Expiry) -> StoreResult<String>;

    /// Reads `key`; `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Fetches the page of keys matching `pattern` at `cursor`.
    ///
    /// `count` is a hint; a page may hold more or fewer keys.
    async fn scan(&self, cursor: ScanCursor, pattern: &str, count: usize) -> StoreResult<ScanPage>;

    /// Deletes `keys`, returning how many existed.
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// Checks that the store answers.
    async fn ping(&self) -> StoreResult<()>;

    /// Best-effort teardown of the underlying connection.
    async fn disconnect(&self) {}
}

// == Connect ==
/// Opens the single process-wide store handle for `endpoint`.
pub async fn connect(endpoint: &StoreEndpoint) -> StoreResult<Arc<dyn KvStore>> {
    match endpoint {
        StoreEndpoint::Redis(redis) => {
            let session = StoreSession::connect(redis).await?;
            info!("Store connected at {}", redis);
            Ok(Arc::new(session))
        }
        StoreEndpoint::Memory => {
            info!("Using embedded in-process store");
            let store = Arc::new(MemoryStore::new());
            spawn_reaper(&store, REAP_INTERVAL);
            Ok(store)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_rejects_zero() {
        assert!(matches!(Expiry::from_secs(0), Err(StoreError::InvalidExpiry)));
        assert_eq!(Expiry::from_secs(120).unwrap().as_secs(), 120);
    }

    #[test]
    fn test_cursor_sentinel() {
        assert!(ScanCursor::START.is_start());
        assert!(ScanCursor::default().is_start());
        assert!(!ScanCursor::new(17).is_start());
    }

    #[tokio::test]
    async fn test_connect_memory_endpoint() {
        let store = connect(&StoreEndpoint::Memory).await.unwrap();
        store.ping().await.unwrap();
    }
}
