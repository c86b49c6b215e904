//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with write-time metadata.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant of the write that produced this entry
    pub written_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry written at `now`.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            written_at: now,
        }
    }

    // == Age ==
    /// Returns how long ago the entry was written.
    ///
    /// Saturates to zero if `now` is earlier than the write.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.written_at)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let now = Instant::now();
        let entry = CacheEntry::new("test_value".to_string(), now);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.written_at, now);
        assert_eq!(entry.age(now), Duration::ZERO);
    }

    #[test]
    fn test_entry_age() {
        let now = Instant::now();
        let entry = CacheEntry::new(42u32, now);

        assert_eq!(entry.age(now + Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_entry_age_before_write_is_zero() {
        let now = Instant::now() + Duration::from_secs(10);
        let entry = CacheEntry::new(42u32, now);

        assert_eq!(entry.age(now - Duration::from_secs(1)), Duration::ZERO);
    }
}
