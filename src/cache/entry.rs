//! Cache Entry Module
//!
//! Defines a single cached value together with its tier-derived expiry and
//! the access statistics the eviction policy ranks on.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A stored value plus its lifetime and access metadata.
///
/// Entries are never mutated into a different value: a `set` on an existing
/// key replaces the whole entry, which resets `access_count`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored payload
    pub value: V,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Number of successful reads of this entry instance
    pub access_count: u64,
    /// Last read (or insertion) timestamp (Unix milliseconds)
    pub last_access_at: u64,
    /// Store-wide sequence number of the last read or insertion.
    ///
    /// Wall-clock milliseconds tie easily under load, so recency ordering
    /// uses this counter instead.
    pub last_access_seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a fresh entry expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `ttl` - Lifetime of the entry; a zero TTL yields an already-expired entry
    /// * `seq` - The store's access sequence at insertion time
    pub fn new(value: V, ttl: Duration, seq: u64) -> Self {
        let now = current_timestamp_ms();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        Self {
            value,
            stored_at: now,
            expires_at: now.saturating_add(ttl_ms),
            access_count: 0,
            last_access_at: now,
            last_access_seq: seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`, so an
    /// entry whose `stored_at + ttl <= now` is never served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Touch ==
    /// Records a read of this entry.
    pub fn touch(&mut self, seq: u64) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_access_at = current_timestamp_ms();
        self.last_access_seq = seq;
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("rows".to_string(), Duration::from_secs(60), 7);

        assert_eq!(entry.value, "rows");
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.last_access_seq, 7);
        assert_eq!(entry.expires_at, entry.stored_at + 60_000);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("rows".to_string(), Duration::from_millis(50), 0);

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), 0);
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new((), Duration::ZERO, 0);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new((), Duration::from_secs(10), 0);

        assert!(!entry.is_expired_at(entry.expires_at - 1));
        assert!(entry.is_expired_at(entry.expires_at), "expired exactly at boundary");
    }

    #[test]
    fn test_touch_updates_access_stats() {
        let mut entry = CacheEntry::new((), Duration::from_secs(10), 1);

        entry.touch(5);
        entry.touch(9);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_access_seq, 9);
        assert!(entry.last_access_at >= entry.stored_at);
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new((), Duration::from_secs(10), 0);

        let remaining = entry.ttl_remaining_ms();
        assert!(remaining <= 10_000);
        assert!(remaining >= 9_000);
    }
}
