//! Namespace cache assembly
//!
//! Builds a shared cache from a base store plus a decorator stack. Stores
//! and decorators are looked up by name in a [`CacheRegistry`]; a store
//! factory takes the cache id, a decorator factory takes the one cache it
//! wraps.

use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::decorators::{
    BlockingCache, FifoCache, LoggingCache, LruCache, ScheduledCache, SerializedCache,
    SynchronizedCache,
};
use crate::perpetual::PerpetualCache;
use query_core::{QueryError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const PERPETUAL: &str = "PERPETUAL";
pub const LRU: &str = "LRU";
pub const FIFO: &str = "FIFO";
pub const SCHEDULED: &str = "SCHEDULED";
pub const SERIALIZED: &str = "SERIALIZED";
pub const SYNCHRONIZED: &str = "SYNCHRONIZED";
pub const LOGGING: &str = "LOGGING";
pub const BLOCKING: &str = "BLOCKING";

pub type StoreFactory = fn(&str) -> Box<dyn Cache>;
pub type DecoratorFactory = fn(Box<dyn Cache>) -> Box<dyn Cache>;

/// How a registered name is constructed
#[derive(Clone, Copy)]
pub enum CacheFactory {
    Store(StoreFactory),
    Decorator(DecoratorFactory),
}

/// Name to factory lookup used by [`CacheBuilder`]
#[derive(Clone)]
pub struct CacheRegistry {
    factories: HashMap<String, CacheFactory>,
}

impl CacheRegistry {
    /// Registry with no entries
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register_store(&mut self, name: &str, factory: StoreFactory) {
        self.factories
            .insert(name.to_uppercase(), CacheFactory::Store(factory));
    }

    pub fn register_decorator(&mut self, name: &str, factory: DecoratorFactory) {
        self.factories
            .insert(name.to_uppercase(), CacheFactory::Decorator(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_uppercase())
    }

    fn new_store(&self, name: &str, id: &str) -> Result<Box<dyn Cache>> {
        match self.factories.get(&name.to_uppercase()) {
            Some(CacheFactory::Store(factory)) => Ok(factory(id)),
            Some(CacheFactory::Decorator(_)) => Err(QueryError::config(format!(
                "Invalid base cache implementation ({}). Base cache implementations must be constructible from a cache id",
                name
            ))),
            None => Err(QueryError::config(format!(
                "Unknown cache implementation ({})",
                name
            ))),
        }
    }

    fn new_decorator(&self, name: &str, base: Box<dyn Cache>) -> Result<Box<dyn Cache>> {
        match self.factories.get(&name.to_uppercase()) {
            Some(CacheFactory::Decorator(factory)) => Ok(factory(base)),
            Some(CacheFactory::Store(_)) => Err(QueryError::config(format!(
                "Invalid cache decorator ({}). Cache decorators must be constructible from a single cache",
                name
            ))),
            None => Err(QueryError::config(format!(
                "Unknown cache decorator ({})",
                name
            ))),
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_store(PERPETUAL, |id| Box::new(PerpetualCache::new(id)));
        registry.register_decorator(LRU, |base| Box::new(LruCache::new(base)));
        registry.register_decorator(FIFO, |base| Box::new(FifoCache::new(base)));
        registry.register_decorator(SCHEDULED, |base| Box::new(ScheduledCache::new(base)));
        registry.register_decorator(SERIALIZED, |base| Box::new(SerializedCache::new(base)));
        registry.register_decorator(SYNCHRONIZED, |base| {
            Box::new(SynchronizedCache::new(base))
        });
        registry.register_decorator(LOGGING, |base| Box::new(LoggingCache::new(base)));
        registry.register_decorator(BLOCKING, |base| Box::new(BlockingCache::new(base)));
        registry
    }
}

/// Assembles the shared cache for one namespace.
///
/// Resulting stack, outermost first: blocking (optional), logging,
/// synchronized, serialized (read-write only), scheduled (when a clear
/// interval is set), the configured decorators (default LRU), base store.
pub struct CacheBuilder {
    id: String,
    config: CacheConfig,
    registry: CacheRegistry,
}

impl CacheBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: CacheConfig::default(),
            registry: CacheRegistry::default(),
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: CacheRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<Arc<dyn Cache>> {
        let mut config = self.config;
        let implementation = match config.implementation.take() {
            Some(implementation) => implementation,
            None => {
                if config.decorators.is_empty() {
                    config.decorators.push(LRU.to_string());
                }
                PERPETUAL.to_string()
            }
        };

        let mut cache = self.registry.new_store(&implementation, &self.id)?;
        apply_properties(cache.as_mut(), &config)?;

        if implementation.eq_ignore_ascii_case(PERPETUAL) {
            for name in &config.decorators {
                cache = self.registry.new_decorator(name, cache)?;
                apply_properties(cache.as_mut(), &config)?;
            }
            cache = standard_decorators(cache, &config)?;
        } else {
            // custom stores keep their own behaviour; only observe them
            cache = Box::new(LoggingCache::new(cache));
        }

        info!(
            "Built cache '{}' ({} with {:?}, read_write={}, blocking={})",
            self.id, implementation, config.decorators, config.read_write, config.blocking
        );
        Ok(Arc::from(cache))
    }
}

fn standard_decorators(mut cache: Box<dyn Cache>, config: &CacheConfig) -> Result<Box<dyn Cache>> {
    if let Some(size) = config.size {
        if !cache.set_property("size", &size.to_string())? {
            debug!("Cache '{}' has no size property; ignoring size {}", cache.id(), size);
        }
    }
    if let Some(interval) = config.clear_interval() {
        cache = Box::new(ScheduledCache::with_interval(cache, interval));
    }
    if config.read_write {
        cache = Box::new(SerializedCache::new(cache));
    }
    cache = Box::new(SynchronizedCache::new(cache));
    cache = Box::new(LoggingCache::new(cache));
    if config.blocking {
        let mut blocking = BlockingCache::new(cache);
        apply_properties(&mut blocking, config)?;
        cache = Box::new(blocking);
    }
    Ok(cache)
}

fn apply_properties(cache: &mut dyn Cache, config: &CacheConfig) -> Result<()> {
    for (name, value) in &config.properties {
        cache.set_property(name, value)?;
    }
    Ok(())
}
