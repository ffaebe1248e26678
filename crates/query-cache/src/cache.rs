//! The cache capability shared by every store and decorator

use crate::key::CacheKey;
use crate::stats::CacheStats;
use query_core::{Result, Value};
use std::sync::Arc;

/// Value held for a key
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// The query ran and produced nothing worth keeping. Cached so that the
    /// absence is remembered instead of re-queried.
    Empty,
    /// A query for this key is still in flight.
    Placeholder,
    /// Materialized results.
    Value(Vec<Value>),
    /// Encoded form written by the serializing decorator; never surfaces
    /// above it.
    Encoded(Vec<u8>),
}

impl CacheEntry {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, CacheEntry::Placeholder)
    }

    /// Results carried by this entry, if it is a completed one.
    ///
    /// `Empty` yields an empty list; in-flight and encoded entries yield
    /// `None`.
    pub fn results(&self) -> Option<Vec<Value>> {
        match self {
            CacheEntry::Empty => Some(Vec::new()),
            CacheEntry::Value(values) => Some(values.clone()),
            CacheEntry::Placeholder | CacheEntry::Encoded(_) => None,
        }
    }
}

impl From<Vec<Value>> for CacheEntry {
    fn from(values: Vec<Value>) -> Self {
        CacheEntry::Value(values)
    }
}

/// Key/value store contract implemented by the base store and by every
/// decorator.
///
/// Methods take `&self`: a namespace cache is shared between sessions and
/// each layer guards its own state. A decorator wraps exactly one inner
/// cache and forwards to it.
pub trait Cache: Send + Sync {
    fn id(&self) -> &str;

    fn size(&self) -> usize;

    fn put(&self, key: CacheKey, value: CacheEntry) -> Result<()>;

    /// `Ok(None)` means no entry; `Ok(Some(CacheEntry::Empty))` means a
    /// cached absence.
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    fn remove(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    fn clear(&self);

    /// Apply a named configuration property.
    ///
    /// Returns `Ok(false)` when this layer has no such property, and a
    /// configuration error when the value cannot be coerced.
    fn set_property(&mut self, _name: &str, _value: &str) -> Result<bool> {
        Ok(false)
    }

    /// Hit/miss counters of the nearest logging layer, if any.
    fn stats(&self) -> Option<Arc<CacheStats>> {
        None
    }
}

impl std::fmt::Debug for dyn Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("id", &self.id())
            .field("size", &self.size())
            .finish()
    }
}
