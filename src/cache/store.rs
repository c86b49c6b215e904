//! Cache Store Module
//!
//! Entry storage combining a HashMap with LRU tracking, write expiry and
//! size-bounded eviction.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, ExpirationPolicy, LruTracker};

// == Cache Store ==
/// Main cache storage with LRU eviction and expire-after-write.
///
/// Every operation takes the current instant from the caller so the policies
/// are evaluated against a single clock reading per operation.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Performance statistics
    stats: CacheStats,
    expiration: ExpirationPolicy,
    eviction: EvictionPolicy,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore with the given policies.
    pub fn new(eviction: EvictionPolicy, expiration: ExpirationPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            expiration,
            eviction,
        }
    }

    pub fn expiration(&self) -> ExpirationPolicy {
        self.expiration
    }

    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    // == Get ==
    /// Retrieves a live value by key, recording a hit or miss.
    ///
    /// An expired entry is removed and reported as a miss. A hit marks the
    /// key as most recently used but leaves its write time untouched.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        self.remove_if_expired(key, now);

        match self.entries.get(key) {
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Peek ==
    /// Like `get`, without touching statistics or recency.
    pub fn peek(&mut self, key: &K, now: Instant) -> Option<V> {
        self.remove_if_expired(key, now);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Get All Present ==
    /// Returns the live values for every key in `keys` that has one.
    pub fn get_all_present<'a, I>(&mut self, keys: I, now: Instant) -> HashMap<K, V>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        keys.into_iter()
            .filter_map(|key| self.get(key, now).map(|value| (key.clone(), value)))
            .collect()
    }

    // == Put ==
    /// Stores a key-value pair written at `now`.
    ///
    /// If the key already exists the entry is replaced wholesale. If the store
    /// then holds more entries than allowed, expired entries are dropped first;
    /// only if that is not enough are least recently used entries other than
    /// `key` evicted and returned.
    pub fn put(&mut self, key: K, value: V, now: Instant) -> Vec<K> {
        if !self.eviction.admits() {
            trace!(key = ?key, "cache disabled, dropping write");
            return Vec::new();
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, now));
        self.lru.touch(&key);

        if self.eviction.exceeds(self.entries.len()) {
            let purged = self.purge_expired(now, Some(&key));
            if purged > 0 {
                trace!(count = purged, "dropped expired entries before eviction");
            }
        }

        let evicted = self
            .eviction
            .select_victims(&mut self.lru, self.entries.len(), &key);
        for victim in &evicted {
            self.entries.remove(victim);
            self.stats.record_eviction();
            debug!(key = ?victim, "evicted least recently used entry");
        }

        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    // == Invalidate ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn invalidate(&mut self, key: &K) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Invalidate All ==
    /// Removes every entry. Returns the number removed.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Snapshot Keys ==
    /// Returns the keys of all live entries.
    pub fn snapshot_keys(&self, now: Instant) -> HashSet<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| !self.expiration.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self, now: Instant) -> usize {
        self.purge_expired(now, None)
    }

    pub fn record_load_success(&mut self) {
        self.stats.record_load_success();
    }

    pub fn record_load_failure(&mut self) {
        self.stats.record_load_failure();
    }

    /// Removes every expired entry except `protected`.
    fn purge_expired(&mut self, now: Instant, protected: Option<&K>) -> usize {
        let expired_keys: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                protected != Some(*key) && self.expiration.is_expired(entry, now)
            })
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
            self.lru.remove(&key);
        }

        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_if_expired(&mut self, key: &K, now: Instant) {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| self.expiration.is_expired(entry, now));

        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
            trace!(key = ?key, "removed expired entry");
        }
    }
}
