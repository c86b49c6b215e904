//! Cache Module
//!
//! Entry storage with expire-after-write and size-bounded LRU eviction.

mod entry;
mod eviction;
mod expiration;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use eviction::EvictionPolicy;
pub use expiration::ExpirationPolicy;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

/// Store handle shared by a cache, its load coordinator and the cleanup task.
pub type SharedStore<K, V> = Arc<RwLock<CacheStore<K, V>>>;

// == Key and Value Bounds ==
/// Requirements on cache keys. Implemented for every qualifying type.
pub trait CacheKey: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

/// Requirements on cache values. Implemented for every qualifying type.
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + 'static {}
