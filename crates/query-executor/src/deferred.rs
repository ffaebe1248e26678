//! Deferred population of nested-select properties
//!
//! A nested select whose key is still loading further up the same query
//! tree cannot be answered yet. It is queued instead and resolved from the
//! local cache once the outermost query completes.

use crate::local_cache::LocalCache;
use query_cache::{CacheEntry, CacheKey};
use query_core::{ObjectRef, QueryError, Result, Value};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Shape a nested result is stored in on its owning object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetType {
    /// The whole result list
    #[default]
    List,
    /// At most one row; none becomes `Null`
    Single,
}

/// Collapse a result list into the value stored for `target`
pub fn extract_object_from_list(list: Vec<Value>, target: TargetType) -> Result<Value> {
    match target {
        TargetType::List => Ok(Value::List(list)),
        TargetType::Single if list.len() > 1 => Err(QueryError::ResultExtraction(
            "Statement returned more than one row, where no more than one was expected."
                .to_string(),
        )),
        TargetType::Single => Ok(list.into_iter().next().unwrap_or_default()),
    }
}

#[derive(Debug, Clone)]
pub struct DeferredLoad {
    result_object: ObjectRef,
    property: String,
    key: CacheKey,
    target_type: TargetType,
}

impl DeferredLoad {
    pub fn new(
        result_object: ObjectRef,
        property: impl Into<String>,
        key: CacheKey,
        target_type: TargetType,
    ) -> Self {
        Self {
            result_object,
            property: property.into(),
            key,
            target_type,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// True once the key holds a completed result
    pub fn can_load(&self, local_cache: &LocalCache) -> bool {
        local_cache
            .get(&self.key)
            .is_some_and(|entry| !entry.is_placeholder())
    }

    /// Copy the cached result into the target property.
    ///
    /// A key with no completed entry leaves the property untouched.
    pub fn load(&self, local_cache: &LocalCache) -> Result<()> {
        let list = match local_cache.get(&self.key).and_then(CacheEntry::results) {
            Some(list) => list,
            None => {
                trace!(
                    "Deferred load of '{}' skipped, key {} has no completed entry",
                    self.property,
                    self.key
                );
                return Ok(());
            }
        };
        let value = extract_object_from_list(list, self.target_type)?;
        self.result_object.set(self.property.clone(), value);
        Ok(())
    }
}
