//! Copy-on-read through a byte codec

use crate::cache::{Cache, CacheEntry};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use query_core::{QueryError, Result, Value};
use std::sync::Arc;

/// Stores results encoded with `bincode` and decodes a fresh copy on every
/// read, so callers may mutate what they get back without touching the
/// shared entry.
pub struct SerializedCache {
    delegate: Box<dyn Cache>,
}

impl SerializedCache {
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self { delegate }
    }

    fn encode(&self, values: &[Value]) -> Result<Vec<u8>> {
        bincode::serialize(values).map_err(|e| {
            QueryError::config(format!(
                "Cache '{}' failed to make a copy of a value: {}",
                self.delegate.id(),
                e
            ))
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        bincode::deserialize(bytes).map_err(|e| {
            QueryError::config(format!(
                "Cache '{}' holds an undecodable entry: {}",
                self.delegate.id(),
                e
            ))
        })
    }

    fn decode_entry(&self, entry: Option<CacheEntry>) -> Result<Option<CacheEntry>> {
        match entry {
            Some(CacheEntry::Encoded(bytes)) => Ok(Some(CacheEntry::Value(self.decode(&bytes)?))),
            other => Ok(other),
        }
    }
}

impl Cache for SerializedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()> {
        let stored = match value {
            CacheEntry::Value(values) => CacheEntry::Encoded(self.encode(&values)?),
            CacheEntry::Placeholder => {
                return Err(QueryError::config(format!(
                    "Cache '{}' cannot store an in-flight placeholder",
                    self.delegate.id()
                )))
            }
            other => other,
        };
        self.delegate.put(key, stored)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entry = self.delegate.get(key)?;
        self.decode_entry(entry)
    }

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entry = self.delegate.remove(key)?;
        self.decode_entry(entry)
    }

    fn clear(&self) {
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
    use super::super::test_support::key;
    use super::*;
    use crate::perpetual::PerpetualCache;
    use query_core::{record, ObjectRef};

    fn serialized() -> SerializedCache {
        SerializedCache::new(Box::new(PerpetualCache::new("serialized")))
    }

    #[test]
    fn test_round_trip() {
        let cache = serialized();
        let values = vec![
            Value::Int64(1),
            Value::from("Alice"),
            Value::List(vec![Value::Float64(1.5), Value::Null]),
        ];
        cache.put(key(1), CacheEntry::Value(values.clone())).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(CacheEntry::Value(values)));
    }

    #[test]
    fn test_returned_objects_are_copies() {
        let cache = serialized();
        let author = ObjectRef::new(record([("name", "Alice")]));
        cache
            .put(key(1), CacheEntry::Value(vec![Value::Object(author)]))
            .unwrap();

        let first = cache.get(&key(1)).unwrap().and_then(|e| e.results()).unwrap();
        first[0].as_object().unwrap().set("name", Value::from("Mallory"));

        let second = cache.get(&key(1)).unwrap().and_then(|e| e.results()).unwrap();
        assert_eq!(
            second[0].as_object().unwrap().get("name"),
            Some(Value::from("Alice"))
        );
    }

    #[test]
    fn test_empty_marker_passes_through() {
        let cache = serialized();
        cache.put(key(1), CacheEntry::Empty).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(CacheEntry::Empty));
    }

    #[test]
    fn test_placeholder_rejected() {
        let cache = serialized();
        let err = cache.put(key(1), CacheEntry::Placeholder).unwrap_err();
        assert!(matches!(err, QueryError::CacheConfiguration(_)));
        assert_eq!(cache.size(), 0);
    }
}
