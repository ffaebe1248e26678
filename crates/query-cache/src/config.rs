//! Cache configuration options

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for one namespace cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Registered name of the base store; `None` means the perpetual store
    /// with an LRU decorator unless `decorators` says otherwise
    pub implementation: Option<String>,
    /// Registered decorator names, applied innermost first
    pub decorators: Vec<String>,
    /// Bound forwarded to the eviction decorator as its `size` property
    pub size: Option<usize>,
    /// Clear the whole cache once this many milliseconds pass
    pub clear_interval_ms: Option<u64>,
    /// Hand out copies (serialized) rather than shared live objects
    pub read_write: bool,
    /// Serialize concurrent misses on the same key
    pub blocking: bool,
    /// Extra properties offered to every layer's `set_property`
    pub properties: BTreeMap<String, String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            implementation: None,
            decorators: Vec::new(),
            size: None,
            clear_interval_ms: None,
            read_write: true,
            blocking: false,
            properties: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn clear_interval(&self) -> Option<Duration> {
        self.clear_interval_ms.map(Duration::from_millis)
    }

    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = Some(implementation.into());
        self
    }

    pub fn with_decorator(mut self, decorator: impl Into<String>) -> Self {
        self.decorators.push(decorator.into());
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_clear_interval(mut self, interval: Duration) -> Self {
        self.clear_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn with_read_write(mut self, read_write: bool) -> Self {
        self.read_write = read_write;
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}
