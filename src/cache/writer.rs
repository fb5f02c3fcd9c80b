//! Batch Writer Module
//!
//! Writes every pair of a request concurrently, each with the same expiry.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::{Expiry, KvStore};

// == Write Outcome ==
/// Result of writing one key. Failures do not affect sibling keys.
#[derive(Debug)]
pub struct WriteOutcome {
    pub key: String,
    /// The store's status reply, or why the write failed
    pub result: Result<String, StoreError>,
}

impl WriteOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One outcome per requested key, in request order.
pub type BatchResult = Vec<WriteOutcome>;

// == Batch Writer ==
/// Best-effort, non-transactional batch of set-with-expiry writes.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn KvStore>,
    expiry: Expiry,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn KvStore>, expiry: Expiry) -> Self {
        Self { store, expiry }
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    // == Write All ==
    /// Issues one SETEX per pair, all in flight at once, and waits for every
    /// one of them to finish.
    ///
    /// # Arguments
    /// * `entries` - `(key, value)` pairs; an empty slice yields an empty result
    pub async fn write_all(&self, entries: &[(String, String)]) -> BatchResult {
        let writes = entries.iter().map(|(key, value)| async move {
            let result = self.store.set_ex(key, value, self.expiry).await;
            if let Err(e) = &result {
                warn!("Write of key '{}' failed: {}", key, e);
            }
            WriteOutcome {
                key: key.clone(),
                result,
            }
        });

        let outcomes = join_all(writes).await;
        debug!(
            "Batch of {} writes finished, {} failed",
            outcomes.len(),
            outcomes.iter().filter(|o| !o.is_ok()).count()
        );
        outcomes
    }
}
