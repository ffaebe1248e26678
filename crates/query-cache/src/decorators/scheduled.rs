//! Periodic invalidation

use super::parse_property;
use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use parking_lot::Mutex;
use query_core::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_CLEAR_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Empties the delegate once `clear_interval` has passed since the last
/// clear. Checked lazily on every access; there is no background timer.
pub struct ScheduledCache {
    delegate: Box<dyn Cache>,
    clear_interval: Duration,
    last_clear: Mutex<Instant>,
}

impl ScheduledCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self::with_interval(delegate, DEFAULT_CLEAR_INTERVAL)
    }

    pub fn with_interval(delegate: Box<dyn Cache>, clear_interval: Duration) -> Self {
        Self {
            delegate,
            clear_interval,
            last_clear: Mutex::new(Instant::now()),
        }
    }

    pub fn set_clear_interval(&mut self, clear_interval: Duration) {
        self.clear_interval = clear_interval;
    }

    pub fn clear_interval(&self) -> Duration {
        self.clear_interval
    }

    fn clear_when_stale(&self) -> bool {
        let mut last_clear = self.last_clear.lock();
        if last_clear.elapsed() > self.clear_interval {
            debug!("Clearing stale cache '{}'", self.delegate.id());
            *last_clear = Instant::now();
            self.delegate.clear();
            true
        } else {
            false
        }
    }
}

impl Cache for ScheduledCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.clear_when_stale();
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        self.clear_when_stale();
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        if self.clear_when_stale() {
            Ok(None)
        } else {
            self.delegate.get(key)
        }
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        if self.clear_when_stale() {
            Ok(None)
        } else {
            self.delegate.remove(key)
        }
    }

    fn clear(&self) {
        *self.last_clear.lock() = Instant::now();
        self.delegate.clear();
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<bool> {
        match name {
            "clearInterval" => {
                let millis: u64 = parse_property(self.delegate.id(), name, value)?;
                self.clear_interval = Duration::from_millis(millis);
                Ok(true)
            }
            _ => self.delegate.set_property(name, value),
        }
    }

    fn stats(&self) -> Option<Arc<CacheStats>> {
        self.delegate.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{key, rows};
    use super::*;
    use crate::perpetual::PerpetualCache;
    use std::thread;

    #[test]
    fn test_entries_survive_within_interval() {
        let cache = ScheduledCache::new(Box::new(PerpetualCache::new("scheduled")));
        cache.put(key(1), rows(1)).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(rows(1)));
        assert_eq!(cache.clear_interval(), DEFAULT_CLEAR_INTERVAL);
    }

    #[test]
    fn test_clears_after_interval() {
        let cache = ScheduledCache::with_interval(
            Box::new(PerpetualCache::new("scheduled")),
            Duration::from_millis(50),
        );
        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(2)).unwrap();

        thread::sleep(Duration::from_millis(100));

        assert_eq!(cache.get(&key(1)).unwrap(), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_clear_interval_property() {
        let mut cache = ScheduledCache::new(Box::new(PerpetualCache::new("scheduled")));
        assert!(cache.set_property("clearInterval", "250").unwrap());
        assert_eq!(cache.clear_interval(), Duration::from_millis(250));
        assert!(cache.set_property("clearInterval", "-1").is_err());
    }
}
