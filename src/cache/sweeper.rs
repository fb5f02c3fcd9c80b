//! Pattern Deleter Module
//!
//! Sweeps the whole keyspace page by page with a scan cursor and deletes
//! every key matching a glob pattern.
//!
//! # Algorithm
//! 1. Start at `ScanCursor::START`.
//! 2. Fetch one page of matching keys and the next cursor.
//! 3. Delete the page's keys (if any) before asking for the next page.
//! 4. Stop when the cursor is back at `START`.
//!
//! A failed page fetch or delete stops the sweep. Pages already deleted stay
//! deleted, later pages are left untouched, and nothing is raised to the
//! caller: the `SweepReport` says how far the sweep got.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::store::{KvStore, ScanCursor};

/// SCAN COUNT hint used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Page budget used when none is configured. High enough that a well-formed
/// cursor always finishes first.
pub const DEFAULT_MAX_PAGES: u64 = 1_000_000;

// == Sweep Policy ==
/// Limits applied to one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Advisory number of keys the store examines per page
    pub page_size: usize,
    /// Pages fetched before the sweep gives up
    pub max_pages: u64,
    /// Wall-clock time before the sweep gives up; `None` for no limit
    pub max_duration: Option<Duration>,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            max_duration: None,
        }
    }
}

// == Sweep Report ==
/// How a sweep ended.
#[derive(Debug)]
pub enum SweepOutcome {
    /// The cursor returned to its start: every key was visited
    Complete,
    /// The page or time budget ran out before the cursor returned
    BudgetExhausted,
    /// A store call failed; the keyspace may be partially purged
    Aborted(StoreError),
}

/// Summary of one sweep.
#[derive(Debug)]
pub struct SweepReport {
    /// Pages fetched, including the one that failed
    pub pages: u64,
    /// Keys the store reported as removed
    pub deleted: u64,
    pub outcome: SweepOutcome,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, SweepOutcome::Complete)
    }
}

// == Pattern Deleter ==
#[derive(Clone)]
pub struct PatternDeleter {
    store: Arc<dyn KvStore>,
    policy: SweepPolicy,
}

impl PatternDeleter {
    pub fn new(store: Arc<dyn KvStore>, policy: SweepPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> SweepPolicy {
        self.policy
    }

    // == Delete Matching ==
    /// Deletes every key matching `pattern`.
    ///
    /// Never fails; inspect the returned report for partial sweeps.
    pub async fn delete_matching(&self, pattern: &str) -> SweepReport {
        let started = Instant::now();
        let mut cursor = ScanCursor::START;
        let mut pages: u64 = 0;
        let mut deleted: u64 = 0;

        let outcome = loop {
            if pages >= self.policy.max_pages {
                break SweepOutcome::BudgetExhausted;
            }
            if let Some(limit) = self.policy.max_duration {
                if started.elapsed() >= limit {
                    break SweepOutcome::BudgetExhausted;
                }
            }

            pages += 1;
            let page = match self
                .store
                .scan(cursor, pattern, self.policy.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => break SweepOutcome::Aborted(e),
            };

            if !page.keys.is_empty() {
                match self.store.del(&page.keys).await {
                    Ok(n) => deleted += n,
                    Err(e) => break SweepOutcome::Aborted(e),
                }
            }
            debug!(
                "Sweep '{}' page {}: {} matched, next cursor {:?}",
                pattern,
                pages,
                page.keys.len(),
                page.cursor
            );

            cursor = page.cursor;
            if cursor.is_start() {
                break SweepOutcome::Complete;
            }
        };

        match &outcome {
            SweepOutcome::Complete => info!(
                "Purged {} keys matching '{}' in {} pages",
                deleted, pattern, pages
            ),
            SweepOutcome::BudgetExhausted => warn!(
                "Sweep of '{}' stopped after {} pages ({:?}) with {} keys purged; sweep incomplete",
                pattern,
                pages,
                started.elapsed(),
                deleted
            ),
            SweepOutcome::Aborted(e) => error!(
                "Sweep of '{}' aborted on page {} after purging {} keys: {}",
                pattern, pages, deleted, e
            ),
        }

        SweepReport {
            pages,
            deleted,
            outcome,
        }
    }
}
