//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's size bound, expiry, LRU order and
//! statistics, plus load deduplication through the loading cache.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheStore, EvictionPolicy, ExpirationPolicy};
use crate::facade::CacheBuilder;
use crate::load::loader_fn;

// == Test Configuration ==
const TEST_MAX_ENTRIES: u64 = 100;
const TEST_TTL: Duration = Duration::from_secs(300);

fn store(max_entries: u64, ttl: Duration) -> CacheStore<String, String> {
    CacheStore::new(
        EvictionPolicy::new(Some(max_entries)),
        ExpirationPolicy::new(Some(ttl)),
    )
}

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

/// Distinct keys, in generation order.
fn unique_keys_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(key_strategy(), min..max)
        .prop_map(|keys| keys.into_iter().collect())
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so operations collide
    let key = "[a-e]";
    prop_oneof![
        (key, value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every read is counted as exactly one hit or one miss, and the entry
    // count matches the store after any sequence of operations.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = store(3, TEST_TTL);
        let now = Instant::now();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut expected_evictions: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    expected_evictions += store.put(key, value, now).len() as u64;
                }
                CacheOp::Get { key } => match store.get(&key, now) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Invalidate { key } => {
                    store.invalidate(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.evictions, expected_evictions, "Evictions mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    #[test]
    fn prop_put_then_get_returns_value(key in key_strategy(), value in value_strategy()) {
        let mut store = store(TEST_MAX_ENTRIES, TEST_TTL);
        let now = Instant::now();

        store.put(key.clone(), value.clone(), now);

        prop_assert_eq!(store.get(&key, now), Some(value));
    }

    #[test]
    fn prop_invalidate_removes_entry(key in key_strategy(), value in value_strategy()) {
        let mut store = store(TEST_MAX_ENTRIES, TEST_TTL);
        let now = Instant::now();

        store.put(key.clone(), value, now);
        prop_assert!(store.invalidate(&key), "Key should exist before invalidate");

        prop_assert_eq!(store.get(&key, now), None);
        prop_assert!(!store.invalidate(&key), "Second invalidate finds nothing");
    }

    #[test]
    fn prop_overwrite_replaces_value(
        key in key_strategy(),
        first in value_strategy(),
        second in value_strategy()
    ) {
        let mut store = store(TEST_MAX_ENTRIES, TEST_TTL);
        let now = Instant::now();

        store.put(key.clone(), first, now);
        store.put(key.clone(), second.clone(), now);

        prop_assert_eq!(store.get(&key, now), Some(second));
        prop_assert_eq!(store.len(), 1, "Overwrite must not add an entry");
    }

    // After every write the number of entries is within the maximum size.
    #[test]
    fn prop_size_bound_enforced(
        max_entries in 1u64..20,
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200)
    ) {
        let mut store = store(max_entries, TEST_TTL);
        let now = Instant::now();

        for (key, value) in entries {
            store.put(key.clone(), value.clone(), now);
            prop_assert!(
                store.len() as u64 <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
            // The key just written always survives its own eviction pass
            prop_assert_eq!(store.peek(&key, now), Some(value));
        }
    }

    // Entries written before the TTL elapsed are live, at or after it they are gone.
    #[test]
    fn prop_expire_after_write(
        key in key_strategy(),
        value in value_strategy(),
        ttl_secs in 1u64..3600,
        elapsed_secs in 0u64..7200
    ) {
        let ttl = Duration::from_secs(ttl_secs);
        let mut store = store(TEST_MAX_ENTRIES, ttl);
        let written = Instant::now();

        store.put(key.clone(), value.clone(), written);
        let read_at = written + Duration::from_secs(elapsed_secs);

        if elapsed_secs < ttl_secs {
            prop_assert_eq!(store.get(&key, read_at), Some(value));
        } else {
            prop_assert_eq!(store.get(&key, read_at), None);
            prop_assert_eq!(store.len(), 0, "Expired entry should be removed on read");
        }
    }

    // Filling the cache and adding one more key evicts the oldest key.
    #[test]
    fn prop_lru_eviction_order(
        keys in unique_keys_strategy(2, 10),
        new_key in key_strategy(),
        new_value in value_strategy()
    ) {
        prop_assume!(!keys.contains(&new_key));

        let capacity = keys.len() as u64;
        let mut store = store(capacity, TEST_TTL);
        let now = Instant::now();

        for key in &keys {
            store.put(key.clone(), format!("value_{}", key), now);
        }

        let evicted = store.put(new_key.clone(), new_value, now);

        prop_assert_eq!(evicted, vec![keys[0].clone()]);
        prop_assert_eq!(store.len() as u64, capacity);
        prop_assert!(store.peek(&new_key, now).is_some());
        for key in keys.iter().skip(1) {
            prop_assert!(store.peek(key, now).is_some(), "Key '{}' should remain", key);
        }
    }

    // A read makes a key most recently used, moving eviction to the next oldest.
    #[test]
    fn prop_lru_access_tracking(
        keys in unique_keys_strategy(3, 8),
        new_key in key_strategy(),
        new_value in value_strategy()
    ) {
        prop_assume!(!keys.contains(&new_key));

        let mut store = store(keys.len() as u64, TEST_TTL);
        let now = Instant::now();

        for key in &keys {
            store.put(key.clone(), format!("value_{}", key), now);
        }
        prop_assert!(store.get(&keys[0], now).is_some());

        let evicted = store.put(new_key, new_value, now);

        prop_assert_eq!(evicted, vec![keys[1].clone()]);
        prop_assert!(store.peek(&keys[0], now).is_some(), "Accessed key must survive");
    }
}

// Loading cache properties drive a paused runtime per case
proptest! {
    #![proptest_config(ProptestConfig::with_cases(25))]

    // get_all returns exactly the requested keys and loads each distinct key once,
    // no matter how many concurrent callers ask for overlapping keys.
    #[test]
    fn prop_get_all_loads_each_key_once(
        requests in prop::collection::vec(prop::collection::vec(0u32..20, 1..10), 1..6)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let (results, loaded) = runtime.block_on(async move {
            let cache = CacheBuilder::new()
                .maximum_size(TEST_MAX_ENTRIES)
                .build_with_loader(loader_fn(move |key: u32| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        anyhow::Ok(key * 2)
                    }
                }))
                .unwrap();

            let handles: Vec<_> = requests
                .iter()
                .cloned()
                .map(|keys| {
                    let cache = cache.clone();
                    tokio::spawn(async move { (keys.clone(), cache.get_all(keys).await) })
                })
                .collect();

            let mut results = Vec::new();
            for handle in handles {
                results.push(handle.await.unwrap());
            }
            let loaded = cache.keys().await;
            (results, loaded)
        });

        let mut distinct = HashSet::new();
        for (keys, result) in results {
            let result = result.unwrap();
            let requested: HashSet<u32> = keys.iter().copied().collect();
            let returned: HashSet<u32> = result.keys().copied().collect();
            prop_assert_eq!(&returned, &requested);
            for (key, value) in &result {
                prop_assert_eq!(*value, key * 2);
            }
            distinct.extend(requested);
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), distinct.len());
        prop_assert_eq!(loaded, distinct);
    }
}
