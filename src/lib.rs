//! Loading Cache - An in-memory key-value cache
//!
//! Provides size-bounded LRU eviction, expire-after-write and loading of
//! missing values with at most one load in flight per key.

pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod load;
pub mod models;
pub mod tasks;

pub use cache::{CacheKey, CacheStats, CacheValue};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use facade::{Cache, CacheBuilder, LoadingCache};
pub use load::{loader_fn, CacheLoader, FnLoader, MissingKeyPolicy};
pub use tasks::spawn_cleanup_task;
