//! Point Reader Module
//!
//! Single-key lookups.

use std::sync::Arc;

use tracing::warn;

use crate::error::StoreResult;
use crate::store::KvStore;

// == Point Reader ==
#[derive(Clone)]
pub struct PointReader {
    store: Arc<dyn KvStore>,
}

impl PointReader {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Looks up `key`. `Ok(None)` means the key is absent or expired.
    ///
    /// Failures are logged here and returned so the caller decides how to
    /// present them.
    pub async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let result = self.store.get(key).await;
        if let Err(e) = &result {
            warn!("Read of key '{}' failed: {}", key, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Expiry, MemoryStore};

    #[tokio::test]
    async fn test_read_present_and_absent() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_ex("message", "hello", Expiry::from_secs(120).unwrap())
            .await
            .unwrap();

        let reader = PointReader::new(store);
        assert_eq!(reader.read("message").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(reader.read("nonexistent").await.unwrap(), None);
    }
}
