//! Manual Cache
//!
//! A cache the caller populates explicitly with `put` or `get_with`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::{
    CacheKey, CacheStats, CacheStore, CacheValue, EvictionPolicy, ExpirationPolicy, SharedStore,
};
use crate::error::Result;
use crate::facade::CacheBuilder;
use crate::tasks::spawn_cleanup_task;

// == Cache ==
/// Thread-safe, manually populated cache.
///
/// Cloning is cheap and every clone shares the same entries.
pub struct Cache<K, V> {
    store: SharedStore<K, V>,
    eviction: EvictionPolicy,
    expiration: ExpirationPolicy,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            eviction: self.eviction,
            expiration: self.expiration,
        }
    }
}

impl<K: CacheKey, V: CacheValue> Cache<K, V> {
    pub(crate) fn new(eviction: EvictionPolicy, expiration: ExpirationPolicy) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(eviction, expiration))),
            eviction,
            expiration,
        }
    }

    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction
    }

    pub fn expiration_policy(&self) -> ExpirationPolicy {
        self.expiration
    }

    pub(crate) fn store(&self) -> &SharedStore<K, V> {
        &self.store
    }

    // == Get If Present ==
    /// Returns the live value for `key`, if any. Never computes or loads.
    ///
    /// Takes the write lock: a read updates recency and may drop an expired entry.
    pub async fn get_if_present(&self, key: &K) -> Option<V> {
        self.store.write().await.get(key, Instant::now())
    }

    // == Get With ==
    /// Returns the value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs outside any lock. Concurrent callers missing on the same
    /// key may each run it; the last write wins. Use a `LoadingCache` when
    /// loads must be deduplicated.
    pub async fn get_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.get_if_present(&key).await {
            return value;
        }

        let value = compute(&key);
        self.put(key, value.clone()).await;
        value
    }

    // == Get All Present ==
    /// Returns the live values among `keys`. Missing keys are left out.
    pub async fn get_all_present<'a, I>(&self, keys: I) -> HashMap<K, V>
    where
        I: IntoIterator<Item = &'a K>,
    {
        let keys: Vec<&K> = keys.into_iter().collect();
        self.store
            .write()
            .await
            .get_all_present(keys, Instant::now())
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry.
    pub async fn put(&self, key: K, value: V) {
        self.store.write().await.put(key, value, Instant::now());
    }

    pub async fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let now = Instant::now();
        let mut store = self.store.write().await;
        for (key, value) in entries {
            store.put(key, value, now);
        }
    }

    // == Invalidate ==
    /// Removes `key`. No error if it is absent.
    pub async fn invalidate(&self, key: &K) {
        self.store.write().await.invalidate(key);
    }

    pub async fn invalidate_keys<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
    {
        let keys: Vec<&K> = keys.into_iter().collect();
        let mut store = self.store.write().await;
        for key in keys {
            store.invalidate(key);
        }
    }

    pub async fn invalidate_all(&self) {
        self.store.write().await.invalidate_all();
    }

    // == Introspection ==
    /// Number of stored entries, possibly counting expired ones not yet removed.
    pub async fn estimated_size(&self) -> usize {
        self.store.read().await.len()
    }

    /// Keys of the live entries.
    pub async fn keys(&self) -> HashSet<K> {
        self.store.read().await.snapshot_keys(Instant::now())
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Maintenance ==
    /// Removes expired entries now. Returns how many were removed.
    pub async fn clean_up(&self) -> usize {
        self.store.write().await.cleanup_expired(Instant::now())
    }

    /// Starts a background sweep of expired entries every `interval`.
    ///
    /// Must be called from within a tokio runtime. The task ends when the last
    /// handle to the cache is dropped, or when the returned handle is aborted.
    /// A zero `interval` is a configuration error.
    pub fn spawn_cleanup(&self, interval: Duration) -> Result<JoinHandle<()>> {
        spawn_cleanup_task(&self.store, interval)
    }
}
