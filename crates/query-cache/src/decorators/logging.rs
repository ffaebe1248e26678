//! Hit-ratio observability

use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use query_core::Result;
use std::sync::Arc;
use tracing::debug;

/// Counts reads and hits; never changes what the delegate returns.
pub struct LoggingCache {
    delegate: Box<dyn Cache>,
    stats: Arc<CacheStats>,
}

impl LoggingCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self {
            delegate,
            stats: Arc::new(CacheStats::new()),
        }
    }
}

impl Cache for LoggingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let value = self.delegate.get(key)?;
        self.stats.record_read(value.is_some());
        debug!(
            "Cache Hit Ratio [{}]: {}",
            self.delegate.id(),
            self.stats.hit_ratio()
        );
        Ok(value)
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<bool> {
        self.delegate.set_property(name, value)
    }

    fn stats(&self) -> Option<Arc<CacheStats>> {
        Some(Arc::clone(&self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{key, rows};
    use super::*;
    use crate::perpetual::PerpetualCache;

    #[test]
    fn test_counts_hits_and_misses() {
        let cache = LoggingCache::new(Box::new(PerpetualCache::new("logged")));
        cache.put(key(1), rows(1)).unwrap();

        assert_eq!(cache.get(&key(1)).unwrap(), Some(rows(1)));
        assert_eq!(cache.get(&key(2)).unwrap(), None);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.requests(), 2);
        assert_eq!(stats.hits(), 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }
}
