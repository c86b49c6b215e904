//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a new tick from a monotonic counter:
/// - `ticks` maps key -> its latest tick
/// - `order` maps tick -> key, so the first entry is the least recently used
#[derive(Debug)]
pub struct LruTracker<K> {
    ticks: HashMap<K, u64>,
    order: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self {
            ticks: HashMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }
}

impl<K: Hash + Eq + Clone> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &K) {
        let tick = self.next_tick;
        self.next_tick += 1;

        if let Some(previous) = self.ticks.insert(key.clone(), tick) {
            self.order.remove(&previous);
        }
        self.order.insert(tick, key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key that is not `protected`.
    ///
    /// Returns None if no such key is tracked.
    pub fn evict_oldest_except(&mut self, protected: &K) -> Option<K> {
        let tick = self
            .order
            .iter()
            .find(|(_, key)| *key != protected)
            .map(|(tick, _)| *tick)?;

        let key = self.order.remove(&tick)?;
        self.ticks.remove(&key);
        Some(key)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.ticks.clear();
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    #[allow(dead_code)]
    pub fn contains(&self, key: &K) -> bool {
        self.ticks.contains_key(key)
    }
}
