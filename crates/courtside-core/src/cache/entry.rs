// A cached value stamped with its write time and lifetime.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// One cache slot. `ttl` is always non-zero; the cache refuses zero-TTL writes.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub written_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, written_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            written_at,
            ttl,
        }
    }

    /// Expired when strictly more than `ttl` has elapsed since the write.
    ///
    /// A write stamped in the future (clock skew between processes sharing
    /// the durable tier) is treated as fresh.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.written_at).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            value: f(self.value),
            written_at: self.written_at,
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn fresh_until_ttl_has_fully_elapsed() {
        let written = Utc::now();
        let entry = CacheEntry::new(1, written, Duration::from_millis(100));

        assert!(!entry.is_expired_at(written));
        assert!(!entry.is_expired_at(written + TimeDelta::milliseconds(100)));
        assert!(entry.is_expired_at(written + TimeDelta::milliseconds(101)));
    }

    #[test]
    fn future_stamp_is_not_expired() {
        let now = Utc::now();
        let entry = CacheEntry::new("v", now + TimeDelta::seconds(30), Duration::from_secs(1));
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn map_keeps_stamp() {
        let written = Utc::now();
        let entry = CacheEntry::new(2, written, Duration::from_secs(5)).map(|v| v * 10);
        assert_eq!(entry.value, 20);
        assert_eq!(entry.written_at, written);
        assert_eq!(entry.ttl, Duration::from_secs(5));
    }
}
