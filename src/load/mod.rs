//! Load Module
//!
//! Loader capability and the coordinator that deduplicates concurrent loads.

mod coordinator;
mod loader;

pub use coordinator::{LoadCoordinator, MissingKeyPolicy};
pub use loader::{loader_fn, CacheLoader, FnLoader};
