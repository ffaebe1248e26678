//! Cache decorators
//!
//! Each decorator owns exactly one inner cache and adds one concern on top
//! of it. Stacks are assembled by [`crate::builder::CacheBuilder`].

pub mod blocking;
pub mod fifo;
pub mod logging;
pub mod lru;
pub mod scheduled;
pub mod serialized;
pub mod synchronized;

pub use blocking::BlockingCache;
pub use fifo::FifoCache;
pub use logging::LoggingCache;
pub use lru::LruCache;
pub use scheduled::ScheduledCache;
pub use serialized::SerializedCache;
pub use synchronized::SynchronizedCache;

use query_core::{QueryError, Result};
use std::str::FromStr;

/// Coerce a string property into the setter's type
pub(crate) fn parse_property<T: FromStr>(cache_id: &str, name: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        QueryError::config(format!(
            "Unsupported value '{}' for property '{}' of cache '{}'",
            value, name, cache_id
        ))
    })
}
