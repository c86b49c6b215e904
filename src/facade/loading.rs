//! Loading Cache
//!
//! A cache that fills its own misses through a [`CacheLoader`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::{CacheKey, CacheStats, CacheValue, EvictionPolicy, ExpirationPolicy};
use crate::error::Result;
use crate::facade::Cache;
use crate::load::{CacheLoader, LoadCoordinator, MissingKeyPolicy};

// == Loading Cache ==
/// Thread-safe cache that loads missing values on demand.
///
/// At most one load runs per key at a time: concurrent callers for a key
/// that is being loaded wait for that load instead of starting another.
/// Values written with `put` are indistinguishable from loaded ones.
pub struct LoadingCache<K, V> {
    cache: Cache<K, V>,
    coordinator: Arc<LoadCoordinator<K, V>>,
}

impl<K, V> Clone for LoadingCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<K: CacheKey, V: CacheValue> LoadingCache<K, V> {
    pub(crate) fn new(
        cache: Cache<K, V>,
        loader: Arc<dyn CacheLoader<K, V>>,
        missing_key_policy: MissingKeyPolicy,
    ) -> Self {
        let coordinator = Arc::new(LoadCoordinator::new(
            Arc::clone(cache.store()),
            loader,
            missing_key_policy,
        ));
        Self { cache, coordinator }
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.cache.eviction_policy()
    }

    pub fn expiration_policy(&self) -> ExpirationPolicy {
        self.cache.expiration_policy()
    }

    pub fn missing_key_policy(&self) -> MissingKeyPolicy {
        self.coordinator.missing_key_policy()
    }

    // == Get ==
    /// Returns the value for `key`, loading it on a miss.
    ///
    /// A loader failure is returned to this caller and to every other caller
    /// waiting on the same load; nothing is cached, so the next call retries.
    pub async fn get(&self, key: &K) -> Result<V> {
        if let Some(value) = self.cache.get_if_present(key).await {
            return Ok(value);
        }
        self.coordinator.load(key.clone()).await
    }

    // == Get All ==
    /// Returns values for all `keys`, loading the missing ones together.
    ///
    /// Resident keys are served from the cache. Missing keys go to the
    /// loader's `load_all` in a single call when it is supported, otherwise
    /// to `load` once per key. Keys the loader does not return are handled
    /// according to the cache's [`MissingKeyPolicy`].
    pub async fn get_all<I>(&self, keys: I) -> Result<HashMap<K, V>>
    where
        I: IntoIterator<Item = K>,
    {
        let mut seen = HashSet::new();
        let keys: Vec<K> = keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let mut result = self.cache.get_all_present(keys.iter()).await;
        let missing: Vec<K> = keys
            .into_iter()
            .filter(|key| !result.contains_key(key))
            .collect();

        if !missing.is_empty() {
            let loaded = self.coordinator.load_all(missing).await?;
            result.extend(loaded);
        }

        Ok(result)
    }

    // == Refresh ==
    /// Loads `key` again, even if it is cached, and returns the new value.
    ///
    /// The cached value stays readable while the load runs. If the load fails
    /// the cached value is kept.
    pub async fn refresh(&self, key: K) -> Result<V> {
        self.coordinator.refresh(key).await
    }

    // == Manual Surface ==
    pub async fn get_if_present(&self, key: &K) -> Option<V> {
        self.cache.get_if_present(key).await
    }

    pub async fn get_all_present<'a, I>(&self, keys: I) -> HashMap<K, V>
    where
        I: IntoIterator<Item = &'a K>,
    {
        self.cache.get_all_present(keys).await
    }

    /// Stores `value` under `key`. A load in flight for the key still answers
    /// its waiters but no longer overwrites this value.
    pub async fn put(&self, key: K, value: V) {
        self.coordinator.put(key, value).await;
    }

    pub async fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.coordinator.put_all(entries).await;
    }

    /// Removes `key`. A load in flight for the key will not store its result.
    pub async fn invalidate(&self, key: &K) {
        self.coordinator.invalidate(key).await;
    }

    pub async fn invalidate_keys<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
    {
        self.coordinator.invalidate_keys(keys).await;
    }

    pub async fn invalidate_all(&self) {
        self.coordinator.invalidate_all().await;
    }

    pub async fn estimated_size(&self) -> usize {
        self.cache.estimated_size().await
    }

    pub async fn keys(&self) -> HashSet<K> {
        self.cache.keys().await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clean_up(&self) -> usize {
        self.cache.clean_up().await
    }

    pub fn spawn_cleanup(&self, interval: Duration) -> Result<JoinHandle<()>> {
        self.cache.spawn_cleanup(interval)
    }
}
