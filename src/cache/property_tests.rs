//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the batch writer and pattern deleter against
//! arbitrary keyspaces and page sizes.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::cache::{BatchWriter, PatternDeleter, SweepPolicy};
use crate::store::{glob_match, Expiry, KvStore, MemoryStore};

// == Test Configuration ==
const TEST_TTL: u64 = 120;

// == Strategies ==
/// Keys drawn from a few prefixes so patterns both hit and miss
fn key_strategy() -> impl Strategy<Value = String> {
    ("(app|user|sess)_", "[a-z0-9]{1,8}").prop_map(|(prefix, suffix)| format!("{}{}", prefix, suffix))
}

fn pattern_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("app_*".to_string()),
        Just("user_?*".to_string()),
        Just("*_[a-m]*".to_string()),
        Just("*".to_string()),
        Just("nothing_*".to_string()),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio_test::block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Deleting by pattern removes exactly the matching keys, whatever the page size.
    #[test]
    fn prop_sweep_removes_exactly_matching_keys(
        keys in prop::collection::hash_set(key_strategy(), 0..120),
        pattern in pattern_strategy(),
        page_size in 1usize..64,
    ) {
        block_on(async {
            let store = Arc::new(MemoryStore::new());
            let ttl = Expiry::from_secs(TEST_TTL).unwrap();
            for key in &keys {
                store.set_ex(key, "v", ttl).await.unwrap();
            }

            let deleter = PatternDeleter::new(
                store.clone(),
                SweepPolicy { page_size, ..SweepPolicy::default() },
            );
            let report = deleter.delete_matching(&pattern).await;

            let expected: HashSet<&String> =
                keys.iter().filter(|k| glob_match(&pattern, k)).collect();
            prop_assert!(report.is_complete());
            prop_assert_eq!(report.deleted as usize, expected.len());

            for key in &keys {
                let present = store.get(key).await.unwrap().is_some();
                prop_assert_eq!(present, !expected.contains(key), "key {}", key);
            }
            Ok(())
        })?;
    }

    // Every pair of a batch is readable afterwards with its last written value.
    #[test]
    fn prop_batch_write_then_read(
        entries in prop::collection::vec((key_strategy(), "[ -~]{0,32}"), 0..40),
    ) {
        block_on(async {
            let store = Arc::new(MemoryStore::new());
            let writer = BatchWriter::new(store.clone(), Expiry::from_secs(TEST_TTL).unwrap());

            let outcomes = writer.write_all(&entries).await;
            prop_assert_eq!(outcomes.len(), entries.len());
            prop_assert!(outcomes.iter().all(|o| o.is_ok()));

            let last: BTreeMap<&String, &String> =
                entries.iter().map(|(k, v)| (k, v)).collect();
            for (key, value) in last {
                let got = store.get(key).await.unwrap();
                prop_assert_eq!(got.as_ref(), Some(value));
            }
            Ok(())
        })?;
    }
}
