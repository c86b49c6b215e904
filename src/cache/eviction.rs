//! Eviction Policy Module
//!
//! Enforces the maximum entry count by choosing least recently used victims.

use std::hash::Hash;

use crate::cache::LruTracker;

// == Eviction Policy ==
/// Size-bounded LRU eviction.
///
/// `maximum_size` of `None` means unbounded. `Some(0)` disables caching
/// altogether: nothing is admitted and every read misses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    maximum_size: Option<u64>,
}

impl EvictionPolicy {
    // == Constructor ==
    pub fn new(maximum_size: Option<u64>) -> Self {
        Self { maximum_size }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn maximum_size(&self) -> Option<u64> {
        self.maximum_size
    }

    // == Admits ==
    /// Returns false when the cache is configured to hold nothing.
    pub fn admits(&self) -> bool {
        self.maximum_size != Some(0)
    }

    // == Exceeds ==
    /// Checks whether `len` entries is over the bound.
    pub fn exceeds(&self, len: usize) -> bool {
        match self.maximum_size {
            Some(max) => len as u64 > max,
            None => false,
        }
    }

    // == Select Victims ==
    /// Removes from `lru` and returns the keys to evict so that `len` entries
    /// fit the bound. The key inserted by the triggering write is never chosen.
    pub fn select_victims<K: Hash + Eq + Clone>(
        &self,
        lru: &mut LruTracker<K>,
        mut len: usize,
        inserted: &K,
    ) -> Vec<K> {
        let mut victims = Vec::new();

        while self.exceeds(len) {
            match lru.evict_oldest_except(inserted) {
                Some(victim) => {
                    victims.push(victim);
                    len -= 1;
                }
                None => break,
            }
        }

        victims
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_exceeds() {
        let policy = EvictionPolicy::unbounded();
        assert!(policy.admits());
        assert!(!policy.exceeds(usize::MAX));
    }

    #[test]
    fn test_zero_size_disables_admission() {
        let policy = EvictionPolicy::new(Some(0));
        assert!(!policy.admits());
        assert!(policy.exceeds(1));
    }

    #[test]
    fn test_exceeds_boundary() {
        let policy = EvictionPolicy::new(Some(3));
        assert!(!policy.exceeds(3));
        assert!(policy.exceeds(4));
    }

    #[test]
    fn test_select_victims_oldest_first() {
        let policy = EvictionPolicy::new(Some(2));
        let mut lru = LruTracker::new();
        for k in ["a", "b", "c", "d"] {
            lru.touch(&k);
        }

        let victims = policy.select_victims(&mut lru, 4, &"d");

        assert_eq!(victims, vec!["a", "b"]);
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_select_victims_never_picks_inserted_key() {
        let policy = EvictionPolicy::new(Some(1));
        let mut lru = LruTracker::new();
        // Inserted key carries the oldest tick
        lru.touch(&"inserted");
        lru.touch(&"other");

        let victims = policy.select_victims(&mut lru, 2, &"inserted");

        assert_eq!(victims, vec!["other"]);
        assert!(lru.contains(&"inserted"));
    }

    #[test]
    fn test_select_victims_within_bound_is_empty() {
        let policy = EvictionPolicy::new(Some(10));
        let mut lru = LruTracker::new();
        lru.touch(&1u8);

        assert!(policy.select_victims(&mut lru, 1, &1u8).is_empty());
    }
}
