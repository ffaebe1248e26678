//! Unit-of-work buffering in front of shared caches
//!
//! Writes made during a unit of work stay private until commit. Keys that
//! missed are remembered: on commit they are written as cached absences, on
//! rollback they are removed from the shared cache, which also releases any
//! key lock a blocking decorator took on the miss.

use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use query_core::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Write buffer wrapping one shared cache for one unit of work
pub struct TransactionalCache {
    delegate: Arc<dyn Cache>,
    clear_on_commit: bool,
    entries_to_add_on_commit: HashMap<CacheKey, CacheEntry>,
    entries_missed_in_cache: HashSet<CacheKey>,
}

impl TransactionalCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            clear_on_commit: false,
            entries_to_add_on_commit: HashMap::new(),
            entries_missed_in_cache: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.delegate.id()
    }

    pub fn size(&self) -> usize {
        self.delegate.size()
    }

    /// Read through to the shared cache. A pending clear hides whatever the
    /// shared cache still holds.
    ///
    /// This unit of work's own buffered write wins over the shared cache, and
    /// a key that already missed is not read again: a blocking delegate still
    /// holds that key's lock on our behalf until commit or rollback.
    pub fn get(&mut self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        if let Some(entry) = self.entries_to_add_on_commit.get(key) {
            return Ok(Some(entry.clone()));
        }
        if self.entries_missed_in_cache.contains(key) {
            return Ok(None);
        }
        let value = self.delegate.get(key)?;
        if value.is_none() {
            self.entries_missed_in_cache.insert(key.clone());
        }
        if self.clear_on_commit {
            Ok(None)
        } else {
            Ok(value)
        }
    }

    pub fn put(&mut self, key: CacheKey, value: CacheEntry) {
        self.entries_to_add_on_commit.insert(key, value);
    }

    /// Forget a key that missed without ever being loaded, so commit does
    /// not publish it as an absence. Any lock taken on the miss is released.
    pub fn release(&mut self, key: &CacheKey) {
        if !self.entries_missed_in_cache.remove(key) {
            return;
        }
        if let Err(e) = self.delegate.remove(key) {
            warn!(
                "Unexpected exception while releasing key {} in cache '{}'. Cause: {}",
                key,
                self.delegate.id(),
                e
            );
        }
    }

    pub fn clear(&mut self) {
        self.clear_on_commit = true;
        self.entries_to_add_on_commit.clear();
    }

    pub fn is_pending(&self) -> bool {
        self.clear_on_commit
            || !self.entries_to_add_on_commit.is_empty()
            || !self.entries_missed_in_cache.is_empty()
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.clear_on_commit {
            self.delegate.clear();
        }
        let flushed = self.flush_pending_entries();
        self.reset();
        flushed
    }

    /// Never fails; removal errors are logged and skipped.
    pub fn rollback(&mut self) {
        self.unlock_missed_entries();
        self.reset();
    }

    fn reset(&mut self) {
        self.clear_on_commit = false;
        self.entries_to_add_on_commit.clear();
        self.entries_missed_in_cache.clear();
    }

    // Every write is attempted so blocking locks get released; the first
    // failure is reported.
    fn flush_pending_entries(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        let absent: Vec<CacheKey> = self
            .entries_missed_in_cache
            .drain()
            .filter(|key| !self.entries_to_add_on_commit.contains_key(key))
            .collect();
        for (key, value) in self.entries_to_add_on_commit.drain() {
            if let Err(e) = self.delegate.put(key, value) {
                outcome = outcome.and(Err(e));
            }
        }
        for key in absent {
            if let Err(e) = self.delegate.put(key, CacheEntry::Empty) {
                outcome = outcome.and(Err(e));
            }
        }
        outcome
    }

    fn unlock_missed_entries(&mut self) {
        for key in self.entries_missed_in_cache.drain() {
            if let Err(e) = self.delegate.remove(&key) {
                warn!(
                    "Unexpected exception while notifying a rollback to cache '{}'. Cause: {}",
                    self.delegate.id(),
                    e
                );
            }
        }
    }
}

/// The transactional buffers of one unit of work, one per shared cache
#[derive(Default)]
pub struct TransactionalCacheManager {
    caches: HashMap<String, TransactionalCache>,
}

impl TransactionalCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self, cache: &Arc<dyn Cache>) {
        self.transactional_cache(cache).clear();
    }

    pub fn get(&mut self, cache: &Arc<dyn Cache>, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.transactional_cache(cache).get(key)
    }

    pub fn put(&mut self, cache: &Arc<dyn Cache>, key: CacheKey, value: CacheEntry) {
        self.transactional_cache(cache).put(key, value);
    }

    pub fn release(&mut self, cache: &Arc<dyn Cache>, key: &CacheKey) {
        self.transactional_cache(cache).release(key);
    }

    /// Commit every buffer, reporting the first failure
    pub fn commit(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        for txc in self.caches.values_mut() {
            if let Err(e) = txc.commit() {
                outcome = outcome.and(Err(e));
            }
        }
        outcome
    }

    pub fn rollback(&mut self) {
        for txc in self.caches.values_mut() {
            txc.rollback();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.caches.values().any(TransactionalCache::is_pending)
    }

    fn transactional_cache(&mut self, cache: &Arc<dyn Cache>) -> &mut TransactionalCache {
        self.caches
            .entry(cache.id().to_string())
            .or_insert_with(|| TransactionalCache::new(Arc::clone(cache)))
    }
}
