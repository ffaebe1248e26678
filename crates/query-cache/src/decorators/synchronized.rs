//! Whole-cache mutual exclusion

use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use parking_lot::Mutex;
use query_core::Result;
use std::sync::Arc;

/// Serializes every operation on the wrapped stack behind one mutex, so
/// compound updates inside the stack (index + store) are atomic.
pub struct SynchronizedCache {
    delegate: Box<dyn Cache>,
    lock: Mutex<()>,
}

impl SynchronizedCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self {
            delegate,
            lock: Mutex::new(()),
        }
    }
}

impl Cache for SynchronizedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        let _guard = self.lock.lock();
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        let _guard = self.lock.lock();
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let _guard = self.lock.lock();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let _guard = self.lock.lock();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let _guard = self.lock.lock();
        self.delegate.clear();
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<bool> {
        self.delegate.set_property(name, value)
    }

    fn stats(&self) -> Option<Arc<CacheStats>> {
        self.delegate.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{key, rows};
    use super::super::LruCache;
    use super::*;
    use crate::perpetual::PerpetualCache;
    use std::thread;

    #[test]
    fn test_concurrent_puts_respect_bound() {
        let lru = LruCache::with_size(Box::new(PerpetualCache::new("sync")), 8).unwrap();
        let cache: Arc<dyn Cache> = Arc::new(SynchronizedCache::new(Box::new(lru)));
        let mut handles = vec![];

        for t in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    let n = t * 100 + i;
                    cache.put(key(n), rows(n)).unwrap();
                    cache.get(&key(n)).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.size(), 8);
    }
}
