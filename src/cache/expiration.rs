//! Expiration Policy Module
//!
//! Decides whether an entry is stale based on the time since it was written.

use std::time::Duration;

use tokio::time::Instant;

use crate::cache::CacheEntry;

// == Expiration Policy ==
/// Expire-after-write policy.
///
/// `None` means entries never expire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationPolicy {
    expire_after_write: Option<Duration>,
}

impl ExpirationPolicy {
    // == Constructor ==
    pub fn new(expire_after_write: Option<Duration>) -> Self {
        Self { expire_after_write }
    }

    /// Policy under which entries live until removed explicitly.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn expire_after_write(&self) -> Option<Duration> {
        self.expire_after_write
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once its age is greater than
    /// or equal to the configured duration, so a zero duration expires every
    /// entry at the instant it is written.
    pub fn is_expired<V>(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        match self.expire_after_write {
            Some(ttl) => entry.age(now) >= ttl,
            None => false,
        }
    }
}
