//! Loader Module
//!
//! The capability a loading cache calls to fetch values it does not hold.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;

use crate::cache::{CacheKey, CacheValue};

// == Cache Loader ==
/// Fetches values from a backing source on cache misses.
///
/// Implementations may carry their own state (connection pools, clients).
/// Loads for distinct keys can run concurrently; the cache guarantees at most
/// one load per key at a time.
#[async_trait]
pub trait CacheLoader<K: CacheKey, V: CacheValue>: Send + Sync + 'static {
    /// Loads the value for a single key.
    async fn load(&self, key: &K) -> anyhow::Result<V>;

    /// Whether `load_all` fetches several keys in one call.
    ///
    /// When false, batch requests fall back to one `load` per key.
    fn supports_load_all(&self) -> bool {
        false
    }

    /// Loads values for several keys at once.
    ///
    /// Keys missing from the returned map are handled by the cache's
    /// `MissingKeyPolicy`. Values for keys that were not requested are ignored.
    async fn load_all(&self, keys: &[K]) -> anyhow::Result<HashMap<K, V>> {
        let _ = keys;
        anyhow::bail!("batch loading is not supported by this loader")
    }
}

// == Function Loader ==
/// Adapts an async closure into a single-key [`CacheLoader`].
pub struct FnLoader<F> {
    f: F,
}

/// Wraps `f` so it can be used as a cache loader.
///
/// # Example
/// ```ignore
/// let loader = loader_fn(|key: String| async move { anyhow::Ok(format!("Data for {}", key)) });
/// ```
pub fn loader_fn<F>(f: F) -> FnLoader<F> {
    FnLoader { f }
}

#[async_trait]
impl<K, V, F, Fut> CacheLoader<K, V> for FnLoader<F>
where
    K: CacheKey,
    V: CacheValue,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    async fn load(&self, key: &K) -> anyhow::Result<V> {
        (self.f)(key.clone()).await
    }
}
