//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Cloneable so a single loader failure can be handed to every caller
/// waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The loader returned an error for a key
    #[error("Failed to load key {key}: {cause}")]
    LoadFailure {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// A batch load did not return some of the requested keys
    #[error("Batch load omitted {} requested key(s): {}", .missing.len(), .missing.join(", "))]
    PartialLoadFailure { missing: Vec<String> },

    /// Invalid cache configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The load task ended without producing a result
    #[error("Load aborted for key {0}")]
    LoadAborted(String),
}

impl CacheError {
    /// Wraps a loader error for the given key.
    pub fn load_failure<K: Debug>(key: &K, cause: anyhow::Error) -> Self {
        Self::shared_load_failure(key, &Arc::new(cause))
    }

    /// Same as `load_failure`, for one error reported against several keys.
    pub fn shared_load_failure<K: Debug>(key: &K, cause: &Arc<anyhow::Error>) -> Self {
        CacheError::LoadFailure {
            key: format!("{:?}", key),
            cause: Arc::clone(cause),
        }
    }

    pub fn partial_load_failure<'a, K, I>(missing: I) -> Self
    where
        K: Debug + 'a,
        I: IntoIterator<Item = &'a K>,
    {
        CacheError::PartialLoadFailure {
            missing: missing.into_iter().map(|k| format!("{:?}", k)).collect(),
        }
    }

    pub fn load_aborted<K: Debug>(key: &K) -> Self {
        CacheError::LoadAborted(format!("{:?}", key))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
