//! Composable Query Result Cache for Query Engine
//!
//! This crate provides the namespace-scoped second-level cache: a perpetual
//! base store wrapped in decorators that each add one concern, plus the
//! transactional buffer that keeps a unit of work's writes private until
//! commit.
//!
//! # Features
//!
//! - **Eviction**: LRU (default) or FIFO bound on entry count
//! - **Scheduled Flush**: Whole-cache clear after a configured interval
//! - **Read/Write Copies**: Entries stored serialized so readers never share objects
//! - **Blocking**: One computer per missing key, everyone else waits
//! - **Statistics**: Hit ratio tracked by the logging layer
//! - **Transactions**: Writes published on commit, misses released on rollback
//!
//! # Example
//!
//! ```ignore
//! use query_cache::{CacheBuilder, CacheConfig, TransactionalCacheManager};
//!
//! let cache = CacheBuilder::new("BlogMapper")
//!     .config(CacheConfig::default().with_size(256))
//!     .build()?;
//!
//! let mut tcm = TransactionalCacheManager::new();
//! if tcm.get(&cache, &key)?.is_none() {
//!     tcm.put(&cache, key, rows.into());
//! }
//! tcm.commit()?;
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod decorators;
pub mod key;
pub mod perpetual;
pub mod stats;
pub mod transactional;

pub use builder::{CacheBuilder, CacheFactory, CacheRegistry};
pub use cache::{Cache, CacheEntry};
pub use config::CacheConfig;
pub use decorators::{
    BlockingCache, FifoCache, LoggingCache, LruCache, ScheduledCache, SerializedCache,
    SynchronizedCache,
};
pub use key::{CacheKey, KeyComponent};
pub use perpetual::PerpetualCache;
pub use stats::CacheStats;
pub use transactional::{TransactionalCache, TransactionalCacheManager};
