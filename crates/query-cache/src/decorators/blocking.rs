//! Per-key stampede protection

use super::parse_property;
use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use query_core::{QueryError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// One-shot gate that waiters park on until the holder releases the key.
#[derive(Default)]
struct KeyLatch {
    released: Mutex<bool>,
    cond: Condvar,
}

impl KeyLatch {
    fn release(&self) {
        *self.released.lock() = true;
        self.cond.notify_all();
    }

    /// Returns false when `timeout` elapsed before the release.
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut released = self.released.lock();
        match timeout {
            None => {
                while !*released {
                    self.cond.wait(&mut released);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !*released {
                    if self.cond.wait_until(&mut released, deadline).timed_out() {
                        return *released;
                    }
                }
                true
            }
        }
    }
}

/// Lets only one caller compute a missing entry.
///
/// A `get` takes the key's lock. On a hit the lock is released right away;
/// on a miss it stays held until the same key is `put` or `remove`d, and
/// every other reader of that key waits. Locks are scoped to a single key
/// and are released on error paths too.
pub struct BlockingCache {
    delegate: Box<dyn Cache>,
    locks: DashMap<CacheKey, Arc<KeyLatch>>,
    timeout: Option<Duration>,
}

impl BlockingCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self {
            delegate,
            locks: DashMap::new(),
            timeout: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Number of keys currently held by some caller
    pub fn held_locks(&self) -> usize {
        self.locks.len()
    }

    fn acquire_lock(&self, key: &CacheKey) -> Result<()> {
        loop {
            let held = match self.locks.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(KeyLatch::default()));
                    trace!("Acquired lock for key {} on cache {}", key, self.id());
                    return Ok(());
                }
                Entry::Occupied(slot) => Arc::clone(slot.get()),
            };
            if !held.wait(self.timeout) {
                return Err(QueryError::LockTimeout {
                    key: key.to_string(),
                    cache_id: self.id().to_string(),
                    timeout_ms: self.timeout.map(|t| t.as_millis() as u64).unwrap_or(0),
                });
            }
        }
    }

    /// Returns false when nobody held the key.
    fn release_lock(&self, key: &CacheKey) -> bool {
        match self.locks.remove(key) {
            Some((_, latch)) => {
                latch.release();
                true
            }
            None => false,
        }
    }
}

impl Cache for BlockingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        let result = self.delegate.put(key.clone(), value);
        // writes after a hit or a pending clear never took the lock
        if !self.release_lock(&key) {
            trace!("No lock held for key {} on cache {}", key, self.id());
        }
        result
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.acquire_lock(key)?;
        let value = self.delegate.get(key);
        // a miss keeps the lock until the caller puts or removes the key
        if !matches!(value, Ok(None)) {
            self.release_lock(key);
        }
        value
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let result = self.delegate.remove(key);
        if !self.release_lock(key) {
            warn!(
                "Detected an attempt at releasing unacquired lock for key {} on cache {}",
                key,
                self.id()
            );
        }
        result
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<bool> {
        match name {
            "timeout" => {
                let millis: u64 = parse_property(self.delegate.id(), name, value)?;
                self.timeout = Some(Duration::from_millis(millis));
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
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn blocking() -> Arc<BlockingCache> {
        Arc::new(BlockingCache::new(Box::new(PerpetualCache::new("blocking"))))
    }

    #[test]
    fn test_hit_releases_lock() {
        let cache = blocking();
        cache.put(key(1), rows(1)).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(rows(1)));
        assert_eq!(cache.held_locks(), 0);
    }

    #[test]
    fn test_miss_holds_lock_until_put() {
        let cache = blocking();
        assert_eq!(cache.get(&key(1)).unwrap(), None);
        assert_eq!(cache.held_locks(), 1);

        cache.put(key(1), rows(1)).unwrap();
        assert_eq!(cache.held_locks(), 0);
    }

    #[test]
    fn test_second_reader_waits_for_put() {
        let cache = blocking();
        assert_eq!(cache.get(&key(42)).unwrap(), None);

        let finished = Arc::new(AtomicBool::new(false));
        let reader = {
            let cache = Arc::clone(&cache);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let value = cache.get(&key(42)).unwrap();
                finished.store(true, Ordering::SeqCst);
                value
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!finished.load(Ordering::SeqCst));

        cache.put(key(42), rows(42)).unwrap();

        assert_eq!(reader.join().unwrap(), Some(rows(42)));
        assert_eq!(cache.held_locks(), 0);
    }

    #[test]
    fn test_remove_releases_waiters() {
        let cache = blocking();
        assert_eq!(cache.get(&key(7)).unwrap(), None);

        let reader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                // the waiter becomes the new computer of the key
                let value = cache.get(&key(7)).unwrap();
                cache.remove(&key(7)).unwrap();
                value
            })
        };

        thread::sleep(Duration::from_millis(50));
        cache.remove(&key(7)).unwrap();

        assert_eq!(reader.join().unwrap(), None);
        assert_eq!(cache.held_locks(), 0);
    }

    #[test]
    fn test_timeout() {
        let mut cache = BlockingCache::new(Box::new(PerpetualCache::new("blocking")));
        assert!(cache.set_property("timeout", "50").unwrap());
        let cache = Arc::new(cache);

        assert_eq!(cache.get(&key(1)).unwrap(), None);

        let waiter = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&key(1)))
        };

        let err = waiter.join().unwrap().unwrap_err();
        assert!(matches!(err, QueryError::LockTimeout { timeout_ms: 50, .. }));
        cache.remove(&key(1)).unwrap();
    }

    #[test]
    fn test_remove_without_lock_leaves_other_keys_held() {
        let cache = blocking();
        assert_eq!(cache.get(&key(1)).unwrap(), None);
        cache.remove(&key(2)).unwrap();
        assert_eq!(cache.held_locks(), 1);
        cache.remove(&key(1)).unwrap();
        assert_eq!(cache.held_locks(), 0);
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let cache = blocking();
        assert_eq!(cache.get(&key(1)).unwrap(), None);
        assert_eq!(cache.get(&key(2)).unwrap(), None);
        assert_eq!(cache.held_locks(), 2);
        cache.remove(&key(1)).unwrap();
        cache.remove(&key(2)).unwrap();
    }
}
