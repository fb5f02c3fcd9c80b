//! Embedded Store Module
//!
//! An in-process implementation of the store contract, selected with
//! `memory://`. Entries expire on `tokio::time::Instant`, so a paused test
//! clock controls expiry.
//!
//! Expired entries are dropped lazily when touched and by a background
//! reaper started with [`spawn_reaper`], so keys written once and never read
//! again do not accumulate.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use super::{glob_match, Expiry, KvStore, ScanCursor, ScanPage};
use crate::error::StoreResult;

// == Entry ==
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
    /// Position in scan order; never reused
    slot: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Scan order. Slots only grow, so removing keys never shifts a cursor.
    slots: BTreeMap<u64, String>,
    next_slot: u64,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.slots.remove(&entry.slot);
        Some(entry)
    }
}

// == Memory Store ==
/// In-process key-value store with per-entry expiry and cursor scans.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                slots: BTreeMap::new(),
                // Slot 0 is the START cursor, so real slots begin at 1.
                next_slot: 1,
            }),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every expired entry, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }
}

/// How often the reaper started by `store::connect` runs.
pub const REAP_INTERVAL: Duration = Duration::from_secs(1);

// == Reaper ==
/// Spawns a task that purges expired entries from `store` every `interval`.
///
/// The task holds only a weak reference and exits once the store is dropped.
pub fn spawn_reaper(store: &Arc<MemoryStore>, interval: Duration) -> JoinHandle<()> {
    let store: Weak<MemoryStore> = Arc::downgrade(store);

    tokio::spawn(async move {
        info!("Starting expiry reaper with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(store) = store.upgrade() else {
                debug!("Embedded store dropped, stopping expiry reaper");
                return;
            };
            let removed = store.purge_expired().await;
            if removed > 0 {
                info!("Expiry reaper: removed {} expired entries", removed);
            } else {
                debug!("Expiry reaper: no expired entries found");
            }
        }
    })
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Expiry) -> StoreResult<String> {
        let expires_at = Instant::now() + Duration::from_secs(ttl.as_secs());
        let mut inner = self.inner.write().await;

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.value = value.to_string();
            entry.expires_at = expires_at;
            return Ok("OK".to_string());
        }

        let slot = inner.next_slot;
        inner.next_slot += 1;
        inner.slots.insert(slot, key.to_string());
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
                slot,
            },
        );
        Ok("OK".to_string())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        match inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        inner.remove(key);
        Ok(None)
    }

    async fn scan(&self, cursor: ScanCursor, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let now = Instant::now();
        let budget = count.max(1);
        let mut inner = self.inner.write().await;

        let mut keys = Vec::new();
        let mut expired = Vec::new();
        let mut next = ScanCursor::START;

        for (visited, (&slot, key)) in inner.slots.range(cursor.raw()..).enumerate() {
            if visited == budget {
                next = ScanCursor::new(slot);
                break;
            }
            match inner.entries.get(key) {
                Some(entry) if entry.is_expired(now) => expired.push(key.clone()),
                Some(_) if glob_match(pattern, key) => keys.push(key.clone()),
                _ => {}
            }
        }

        for key in expired {
            inner.remove(&key);
        }

        Ok(ScanPage { cursor: next, keys })
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        let removed = keys
            .iter()
            .filter_map(|key| inner.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
