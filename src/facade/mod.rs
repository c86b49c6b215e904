//! Cache Facade Module
//!
//! Public cache types composed from the store, policies and load coordinator.
//!
//! # Variants
//! - [`Cache`]: populated by the caller (`put`, `get_with`)
//! - [`LoadingCache`]: populated by a [`CacheLoader`](crate::load::CacheLoader) on misses

mod builder;
mod loading;
mod manual;

pub use builder::CacheBuilder;
pub use loading::LoadingCache;
pub use manual::Cache;
