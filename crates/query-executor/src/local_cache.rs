use query_cache::{CacheEntry, CacheKey};
use std::collections::HashMap;

/// First-level cache owned by one executor.
///
/// Never shared across threads, so it is a plain map with no locking.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::Value;

    #[test]
    fn test_placeholder_counts_as_present() {
        let mut cache = LocalCache::new();
        let key = CacheKey::from_components(["BlogMapper.selectBlog"]);
        cache.put(key.clone(), CacheEntry::Placeholder);
        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some_and(CacheEntry::is_placeholder));

        cache.put(key.clone(), CacheEntry::Value(vec![Value::Int64(1)]));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
