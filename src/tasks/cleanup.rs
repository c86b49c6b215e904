//! Expiry Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStore, CacheValue, SharedStore};
use crate::error::{CacheError, Result};

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task holds only a weak reference to the store and exits on its own
/// once the cache is dropped. Reads still check expiry themselves, so the
/// sweep only bounds the memory held by entries nobody reads again.
///
/// # Arguments
/// * `store` - the cache's shared store
/// * `interval` - time between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown, or `CacheError::Configuration` if `interval`
/// is zero.
///
/// # Example
/// ```ignore
/// let handle = cache.spawn_cleanup(Duration::from_secs(1))?;
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V>(
    store: &SharedStore<K, V>,
    interval: Duration,
) -> Result<JoinHandle<()>>
where
    K: CacheKey,
    V: CacheValue,
{
    if interval.is_zero() {
        return Err(CacheError::Configuration(
            "cleanup interval must be greater than zero".to_string(),
        ));
    }

    let store: Weak<RwLock<CacheStore<K, V>>> = Arc::downgrade(store);

    Ok(tokio::spawn(async move {
        info!("Starting expiry cleanup task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(store) = store.upgrade() else {
                debug!("Cache dropped, stopping expiry cleanup task");
                break;
            };

            // Acquire write lock and cleanup expired entries
            let removed = {
                let mut guard = store.write().await;
                guard.cleanup_expired(Instant::now())
            };

            if removed > 0 {
                info!("Expiry cleanup: removed {} expired entries", removed);
            } else {
                debug!("Expiry cleanup: no expired entries found");
            }
        }
    }))
}
