//! Least-recently-used eviction

use super::parse_property;
use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use ::lru::LruCache as KeyIndex;
use parking_lot::Mutex;
use query_core::{QueryError, Result};
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_SIZE: usize = 1024;

/// Bounds the delegate to `size` keys, evicting the least recently used.
///
/// The key index only tracks recency. Reads always go to the delegate; a key
/// missing from the index is not treated as a miss.
pub struct LruCache {
    delegate: Box<dyn Cache>,
    keys: Mutex<KeyIndex<CacheKey, ()>>,
}

impl LruCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self {
            delegate,
            keys: Mutex::new(KeyIndex::new(
                NonZeroUsize::new(DEFAULT_SIZE).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn with_size(delegate: Box<dyn Cache>, size: usize) -> Result<Self> {
        let mut cache = Self::new(delegate);
        cache.set_size(size)?;
        Ok(cache)
    }

    /// Replace the key index with an empty one bounded to `size`
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        let capacity = NonZeroUsize::new(size).ok_or_else(|| {
            QueryError::config(format!(
                "LRU size for cache '{}' must be positive",
                self.delegate.id()
            ))
        })?;
        self.keys = Mutex::new(KeyIndex::new(capacity));
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.keys.lock().cap().get()
    }

    fn cycle_key_list(&self, key: CacheKey) -> Result<()> {
        let pushed = key.clone();
        let evicted = self.keys.lock().push(key, ());
        match evicted {
            // push hands back the old pair when the key was already indexed
            Some((eldest, ())) if eldest != pushed => {
                self.delegate.remove(&eldest)?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl Cache for LruCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        self.delegate.put(key.clone(), value)?;
        self.cycle_key_list(key)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.keys.lock().get(key); // touch
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
        self.keys.lock().clear();
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<bool> {
        match name {
            "size" => {
                let size = parse_property(self.delegate.id(), name, value)?;
                self.set_size(size)?;
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

    fn lru(size: usize) -> LruCache {
        LruCache::with_size(Box::new(PerpetualCache::new("lru")), size).unwrap()
    }

    #[test]
    fn test_default_capacity() {
        let cache = LruCache::new(Box::new(PerpetualCache::new("lru")));
        assert_eq!(cache.capacity(), DEFAULT_SIZE);
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let cache = lru(3);
        for i in 0..4 {
            cache.put(key(i), rows(i)).unwrap();
        }

        assert_eq!(cache.size(), 3);
        assert_eq!(cache.get(&key(0)).unwrap(), None);
        for i in 1..4 {
            assert_eq!(cache.get(&key(i)).unwrap(), Some(rows(i)));
        }
    }

    #[test]
    fn test_read_promotes_key() {
        let cache = lru(2);
        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(2)).unwrap();

        cache.get(&key(1)).unwrap();
        cache.put(key(3), rows(3)).unwrap();

        assert_eq!(cache.get(&key(2)).unwrap(), None);
        assert_eq!(cache.get(&key(1)).unwrap(), Some(rows(1)));
    }

    #[test]
    fn test_reinserting_key_does_not_evict_it() {
        let cache = lru(2);
        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(2)).unwrap();
        cache.put(key(2), rows(20)).unwrap();

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.get(&key(2)).unwrap(), Some(rows(20)));
    }

    #[test]
    fn test_get_delegates_for_unindexed_keys() {
        let base = PerpetualCache::new("lru");
        base.put(key(9), rows(9)).unwrap();
        let cache = LruCache::new(Box::new(base));
        assert_eq!(cache.get(&key(9)).unwrap(), Some(rows(9)));
    }

    #[test]
    fn test_size_property() {
        let mut cache = lru(10);
        assert!(cache.set_property("size", "2").unwrap());
        assert_eq!(cache.capacity(), 2);
        assert!(cache.set_property("size", "big").is_err());
        assert!(cache.set_property("size", "0").is_err());
        assert!(!cache.set_property("color", "red").unwrap());
    }
}
