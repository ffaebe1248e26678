//! Unbounded base store

use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use parking_lot::RwLock;
use query_core::Result;
use std::collections::HashMap;

/// Plain map-backed store with no eviction. Every decorator stack bottoms
/// out here unless a custom store is configured.
#[derive(Debug)]
pub struct PerpetualCache {
    id: String,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl PerpetualCache {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> usize {
        self.entries.read().len()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.write().remove(key))
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::Value;

    fn key(n: i64) -> CacheKey {
        CacheKey::from_components([Value::from("stmt"), Value::Int64(n)])
    }

    #[test]
    fn test_put_get() {
        let cache = PerpetualCache::new("users");
        cache
            .put(key(1), CacheEntry::Value(vec![Value::from("Alice")]))
            .unwrap();

        assert_eq!(
            cache.get(&key(1)).unwrap(),
            Some(CacheEntry::Value(vec![Value::from("Alice")]))
        );
        assert_eq!(cache.get(&key(2)).unwrap(), None);
        assert_eq!(cache.id(), "users");
    }

    #[test]
    fn test_empty_marker_is_stored() {
        let cache = PerpetualCache::new("users");
        cache.put(key(1), CacheEntry::Empty).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(CacheEntry::Empty));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_remove_returns_previous() {
        let cache = PerpetualCache::new("users");
        cache.put(key(1), CacheEntry::Empty).unwrap();
        assert_eq!(cache.remove(&key(1)).unwrap(), Some(CacheEntry::Empty));
        assert_eq!(cache.remove(&key(1)).unwrap(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cache = PerpetualCache::new("users");
        for i in 0..10 {
            cache.put(key(i), CacheEntry::Empty).unwrap();
        }
        cache.clear();
        cache.clear();
        assert_eq!(cache.size(), 0);
    }
}
