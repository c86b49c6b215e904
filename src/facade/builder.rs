//! Cache Builder
//!
//! Construction-time configuration shared by both cache variants.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheKey, CacheValue, EvictionPolicy, ExpirationPolicy};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::facade::{Cache, LoadingCache};
use crate::load::{CacheLoader, MissingKeyPolicy};

// == Cache Builder ==
/// Builds a [`Cache`] or [`LoadingCache`].
///
/// Options are fixed once the cache is built. Setting an option twice is a
/// configuration error reported by `build`.
///
/// # Example
/// ```ignore
/// let cache: Cache<String, String> = CacheBuilder::new()
///     .maximum_size(100)
///     .expire_after_write(Duration::from_secs(60))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    maximum_size: Option<u64>,
    expire_after_write: Option<Duration>,
    missing_key_policy: Option<MissingKeyPolicy>,
    /// First misuse found while configuring
    error: Option<String>,
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut builder = Self::new();
        if let Err(err) = config.validate() {
            builder.error = Some(err.to_string());
        }
        if let Some(size) = config.maximum_size {
            builder = builder.maximum_size(size);
        }
        if let Some(ttl) = config.expire_after_write {
            builder = builder.expire_after_write(ttl);
        }
        builder
    }

    /// Bounds the number of entries. Zero disables caching.
    pub fn maximum_size(mut self, size: u64) -> Self {
        if let Some(previous) = self.maximum_size {
            self.record_error(format!("maximum size was already set to {}", previous));
        }
        self.maximum_size = Some(size);
        self
    }

    /// Expires entries once this long has passed since they were written.
    pub fn expire_after_write(mut self, duration: Duration) -> Self {
        if let Some(previous) = self.expire_after_write {
            self.record_error(format!(
                "expire after write was already set to {:?}",
                previous
            ));
        }
        self.expire_after_write = Some(duration);
        self
    }

    /// How batch loads treat keys the loader does not return.
    pub fn missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        if let Some(previous) = self.missing_key_policy {
            self.record_error(format!(
                "missing key policy was already set to {:?}",
                previous
            ));
        }
        self.missing_key_policy = Some(policy);
        self
    }

    // == Build ==
    /// Builds a manually populated cache.
    pub fn build<K: CacheKey, V: CacheValue>(self) -> Result<Cache<K, V>> {
        let (eviction, expiration) = self.policies()?;
        Ok(Cache::new(eviction, expiration))
    }

    /// Builds a cache that populates itself through `loader`.
    pub fn build_with_loader<K, V, L>(self, loader: L) -> Result<LoadingCache<K, V>>
    where
        K: CacheKey,
        V: CacheValue,
        L: CacheLoader<K, V>,
    {
        let policy = self.missing_key_policy.unwrap_or_default();
        let (eviction, expiration) = self.policies()?;
        let cache = Cache::new(eviction, expiration);
        Ok(LoadingCache::new(cache, Arc::new(loader), policy))
    }

    fn policies(self) -> Result<(EvictionPolicy, ExpirationPolicy)> {
        if let Some(message) = self.error {
            return Err(CacheError::Configuration(message));
        }
        debug!(
            maximum_size = ?self.maximum_size,
            expire_after_write = ?self.expire_after_write,
            "building cache"
        );
        Ok((
            EvictionPolicy::new(self.maximum_size),
            ExpirationPolicy::new(self.expire_after_write),
        ))
    }

    fn record_error(&mut self, message: String) {
        self.error.get_or_insert(message);
    }
}
