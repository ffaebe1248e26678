//! Session execution core
//!
//! One [`Executor`] serves one unit of work. It owns the first-level cache,
//! the nested query depth and the deferred-load queue, and buffers writes
//! to shared second-level caches until the unit of work commits.

use crate::config::{ExecutorConfig, LocalCacheScope};
use crate::deferred::{DeferredLoad, TargetType};
use crate::local_cache::LocalCache;
use crate::materializer::{ResultHandler, ResultMaterializer};
use crate::raw::RawExecutor;
use crate::statement::MappedStatement;
use query_cache::{CacheEntry, CacheKey, TransactionalCacheManager};
use query_core::{
    BoundSql, ObjectRef, ParameterMode, QueryError, Record, Result, RowBounds, Value,
};
use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub struct Executor {
    config: ExecutorConfig,
    raw: Box<dyn RawExecutor>,
    materializer: Arc<dyn ResultMaterializer>,
    local_cache: LocalCache,
    local_output_parameter_cache: HashMap<CacheKey, Record>,
    deferred_loads: VecDeque<DeferredLoad>,
    transactional_caches: TransactionalCacheManager,
    query_stack: usize,
    closed: bool,
}

impl Executor {
    pub fn new(
        config: ExecutorConfig,
        raw: Box<dyn RawExecutor>,
        materializer: Arc<dyn ResultMaterializer>,
    ) -> Self {
        Self {
            config,
            raw,
            materializer,
            local_cache: LocalCache::new(),
            local_output_parameter_cache: HashMap::new(),
            deferred_loads: VecDeque::new(),
            transactional_caches: TransactionalCacheManager::new(),
            query_stack: 0,
            closed: false,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run a select, deriving its key from the statement and parameter
    pub fn query(
        &mut self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Value>> {
        let bound_sql = ms.bound_sql();
        let key = self.create_cache_key(ms, parameter, row_bounds, &bound_sql)?;
        self.query_with_key(ms, parameter, row_bounds, handler, key, &bound_sql)
    }

    /// Run a select under a precomputed key.
    ///
    /// Goes through the namespace's second-level cache when the statement
    /// has one and uses it, then through the local cache.
    pub fn query_with_key(
        &mut self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        key: CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let cache = match ms.cache.as_ref().filter(|_| self.config.cache_enabled) {
            Some(cache) => Arc::clone(cache),
            None => return self.query_local(ms, parameter, row_bounds, handler, key, bound_sql),
        };

        self.flush_cache_if_required(ms);
        if !ms.use_cache || handler.is_some() {
            return self.query_local(ms, parameter, row_bounds, handler, key, bound_sql);
        }

        ensure_no_out_params(ms, bound_sql)?;
        if let Some(list) = self
            .transactional_caches
            .get(&cache, &key)?
            .and_then(|entry| entry.results())
        {
            debug!("Second level cache hit for {} in {}", ms.id, cache.id());
            return Ok(list);
        }
        match self.query_local(ms, parameter, row_bounds, None, key.clone(), bound_sql) {
            Ok(list) => {
                self.transactional_caches
                    .put(&cache, key, CacheEntry::Value(list.clone()));
                Ok(list)
            }
            Err(e) => {
                // a failed load is not an empty result
                self.transactional_caches.release(&cache, &key);
                Err(e)
            }
        }
    }

    /// First-level path: local cache, then the data source.
    fn query_local(
        &mut self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        key: CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>> {
        if self.query_stack == 0 && ms.flush_cache_required {
            self.clear_local_cache();
        }

        self.query_stack += 1;
        let result = self.lookup_or_load(ms, parameter, row_bounds, handler, key, bound_sql);
        self.query_stack -= 1;

        if self.query_stack > 0 {
            return result;
        }
        let list = match result {
            Ok(list) => list,
            Err(e) => {
                self.deferred_loads.clear();
                return Err(e);
            }
        };
        let drained = self.drain_deferred_loads();
        if self.config.local_cache_scope == LocalCacheScope::Statement {
            self.clear_local_cache();
        }
        drained.map(|_| list)
    }

    fn lookup_or_load(
        &mut self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        key: CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>> {
        if handler.is_none() {
            match self.local_cache.get(&key) {
                Some(CacheEntry::Placeholder) => {
                    return Err(QueryError::ExecutionError(format!(
                        "Statement '{}' re-entered while key {} is still loading",
                        ms.id, key
                    )));
                }
                Some(entry) => {
                    if let Some(list) = entry.results() {
                        debug!("Local cache hit for {}", ms.id);
                        self.handle_locally_cached_output_parameters(ms, &key, parameter, bound_sql);
                        return Ok(list);
                    }
                }
                None => {}
            }
        }
        self.query_from_database(ms, parameter, row_bounds, handler, key, bound_sql)
    }

    fn query_from_database(
        &mut self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        key: CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>> {
        self.local_cache.put(key.clone(), CacheEntry::Placeholder);
        trace!("Placeholder set for {} at depth {}", key, self.query_stack);

        let buffered = handler.is_none();
        let loaded = self.load_results(ms, parameter, row_bounds, handler, bound_sql);
        self.local_cache.remove(&key);
        let list = loaded?;

        if buffered {
            self.local_cache.put(key.clone(), CacheEntry::Value(list.clone()));
        }
        if ms.is_callable() {
            if let Some(object) = parameter.as_object() {
                self.local_output_parameter_cache.insert(key, object.snapshot());
            }
        }
        Ok(list)
    }

    fn load_results(
        &mut self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>> {
        let rows = self.raw.query(ms, bound_sql, parameter, row_bounds)?;
        debug!("{} returned {} rows", ms.id, rows.len());

        let materializer = Arc::clone(&self.materializer);
        let list = materializer.materialize(rows, ms, self)?;
        match handler {
            Some(handler) => {
                list.into_iter().for_each(|value| handler.handle_result(value));
                Ok(Vec::new())
            }
            None => Ok(list),
        }
    }

    fn handle_locally_cached_output_parameters(
        &self,
        ms: &MappedStatement,
        key: &CacheKey,
        parameter: &Value,
        bound_sql: &BoundSql,
    ) {
        if !ms.is_callable() {
            return;
        }
        let (Some(cached), Some(target)) =
            (self.local_output_parameter_cache.get(key), parameter.as_object())
        else {
            return;
        };
        for mapping in bound_sql.parameter_mappings() {
            if mapping.mode != ParameterMode::In {
                let value = cached.get(&mapping.property).cloned().unwrap_or_default();
                target.set(mapping.property.clone(), value);
            }
        }
    }

    // Taken before loading so a failing load drops the rest of the queue.
    fn drain_deferred_loads(&mut self) -> Result<()> {
        for load in mem::take(&mut self.deferred_loads) {
            load.load(&self.local_cache)?;
        }
        Ok(())
    }

    /// Key for `ms` run with `parameter`: statement id, offset, limit, SQL,
    /// every non-OUT parameter value in binding order, then the environment
    /// id if one is configured.
    pub fn create_cache_key(
        &self,
        ms: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<CacheKey> {
        self.ensure_open()?;
        let mut key = CacheKey::new();
        key.update(ms.id.as_str());
        key.update(row_bounds.offset);
        key.update(row_bounds.limit);
        key.update(bound_sql.sql());
        key.update_all(bound_sql.input_values(parameter));
        if let Some(environment) = &self.config.environment_id {
            key.update(environment.as_str());
        }
        Ok(key)
    }

    /// True when the local cache holds anything for `key`, including a
    /// result still being loaded
    pub fn is_cached(&self, key: &CacheKey) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.local_cache.contains(key))
    }

    /// Populate `property` of `result_object` from the result cached under
    /// `key`, now if that result is complete, otherwise once the outermost
    /// query finishes.
    pub fn defer_load(
        &mut self,
        result_object: ObjectRef,
        property: &str,
        key: CacheKey,
        target_type: TargetType,
    ) -> Result<()> {
        self.ensure_open()?;
        let load = DeferredLoad::new(result_object, property, key, target_type);
        if load.can_load(&self.local_cache) {
            return load.load(&self.local_cache);
        }
        trace!("Deferring load of '{}' for key {}", property, load.key());
        self.deferred_loads.push_back(load);
        Ok(())
    }

    /// Run an insert, update or delete; returns the affected row count
    pub fn update(&mut self, ms: &MappedStatement, parameter: &Value) -> Result<u64> {
        self.ensure_open()?;
        if self.config.cache_enabled {
            self.flush_cache_if_required(ms);
        }
        self.clear_local_cache();
        let bound_sql = ms.bound_sql();
        self.raw.update(ms, &bound_sql, parameter)
    }

    pub fn commit(&mut self, required: bool) -> Result<()> {
        if self.closed {
            return Err(QueryError::ExecutorClosed(
                "Cannot commit, transaction is already closed".to_string(),
            ));
        }
        self.clear_local_cache();
        if required {
            self.raw.commit()?;
        }
        self.transactional_caches.commit()
    }

    pub fn rollback(&mut self, required: bool) -> Result<()> {
        self.ensure_open()?;
        let rolled_back = self.rollback_local(required);
        self.transactional_caches.rollback();
        rolled_back
    }

    fn rollback_local(&mut self, required: bool) -> Result<()> {
        self.clear_local_cache();
        if required {
            self.raw.rollback()
        } else {
            Ok(())
        }
    }

    /// Publish (or discard, with `force_rollback`) buffered second-level
    /// writes and release the raw executor. Closing twice is a no-op.
    pub fn close(&mut self, force_rollback: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let published = if force_rollback {
            self.transactional_caches.rollback();
            Ok(())
        } else {
            self.transactional_caches.commit()
        };
        if let Err(e) = self.rollback_local(force_rollback) {
            warn!("Unexpected exception on closing transaction. Cause: {}", e);
        }
        self.raw.close();
        self.deferred_loads.clear();
        self.closed = true;
        published
    }

    /// Drop every local result and cached output parameter. Unlike the other
    /// operations this does not fail on a closed executor; it does nothing.
    pub fn clear_local_cache(&mut self) {
        if !self.closed {
            self.local_cache.clear();
            self.local_output_parameter_cache.clear();
        }
    }

    fn flush_cache_if_required(&mut self, ms: &MappedStatement) {
        if let Some(cache) = ms.cache.as_ref().filter(|_| ms.flush_cache_required) {
            self.transactional_caches.clear(cache);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(QueryError::ExecutorClosed("Executor was closed.".to_string()));
        }
        Ok(())
    }
}

fn ensure_no_out_params(ms: &MappedStatement, bound_sql: &BoundSql) -> Result<()> {
    let has_out = bound_sql
        .parameter_mappings()
        .iter()
        .any(|m| m.mode != ParameterMode::In);
    if ms.is_callable() && has_out {
        return Err(QueryError::UnsupportedOperation(format!(
            "Caching stored procedures with OUT params is not supported. Please configure use_cache=false in {} statement.",
            ms.id
        )));
    }
    Ok(())
}
