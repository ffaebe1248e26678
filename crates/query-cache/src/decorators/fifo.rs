//! First-in, first-out eviction

use super::parse_property;
use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use parking_lot::Mutex;
use query_core::Result;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_SIZE: usize = 1024;

/// Bounds the delegate to `size` keys, evicting in insertion order
pub struct FifoCache {
    delegate: Box<dyn Cache>,
    keys: Mutex<VecDeque<CacheKey>>,
    size: usize,
}

impl FifoCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self {
            delegate,
            keys: Mutex::new(VecDeque::new()),
            size: DEFAULT_SIZE,
        }
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    fn cycle_key_list(&self, key: CacheKey) -> Result<()> {
        let oldest = {
            let mut keys = self.keys.lock();
            keys.push_back(key);
            if keys.len() > self.size {
                keys.pop_front()
            } else {
                None
            }
        };
        if let Some(oldest) = oldest {
            self.delegate.remove(&oldest)?;
        }
        Ok(())
    }
}

impl Cache for FifoCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        self.cycle_key_list(key.clone())?;
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
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
                self.size = parse_property(self.delegate.id(), name, value)?;
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

    #[test]
    fn test_evicts_oldest_even_if_read() {
        let mut cache = FifoCache::new(Box::new(PerpetualCache::new("fifo")));
        cache.set_size(2);

        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(2)).unwrap();
        cache.get(&key(1)).unwrap();
        cache.put(key(3), rows(3)).unwrap();

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.get(&key(1)).unwrap(), None);
        assert_eq!(cache.get(&key(3)).unwrap(), Some(rows(3)));
    }

    #[test]
    fn test_size_property() {
        let mut cache = FifoCache::new(Box::new(PerpetualCache::new("fifo")));
        assert!(cache.set_property("size", "1").unwrap());
        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(2)).unwrap();
        assert_eq!(cache.size(), 1);
    }
}
