//! Turning raw rows into result objects
//!
//! A materializer may call back into the executor for nested selects;
//! those calls share the executor's local cache and query depth.

use crate::deferred::{extract_object_from_list, TargetType};
use crate::executor::Executor;
use crate::statement::MappedStatement;
use query_core::{ObjectRef, Record, Result, RowBounds, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub trait ResultMaterializer: Send + Sync {
    fn materialize(
        &self,
        rows: Vec<Record>,
        ms: &MappedStatement,
        executor: &mut Executor,
    ) -> Result<Vec<Value>>;
}

/// Receives results one at a time instead of as a returned list
pub trait ResultHandler {
    fn handle_result(&mut self, value: Value);
}

impl<F: FnMut(Value)> ResultHandler for F {
    fn handle_result(&mut self, value: Value) {
        self(value)
    }
}

/// Maps every row to an object holding its columns
#[derive(Debug, Default)]
pub struct RowMaterializer;

impl ResultMaterializer for RowMaterializer {
    fn materialize(
        &self,
        rows: Vec<Record>,
        _ms: &MappedStatement,
        _executor: &mut Executor,
    ) -> Result<Vec<Value>> {
        Ok(rows
            .into_iter()
            .map(|row| Value::Object(ObjectRef::new(row)))
            .collect())
    }
}

/// A property filled by running another statement with a column of the
/// current row as its parameter
#[derive(Debug, Clone)]
pub struct NestedSelect {
    pub property: String,
    pub column: String,
    pub statement: Arc<MappedStatement>,
    pub target: TargetType,
}

impl NestedSelect {
    pub fn new(
        property: impl Into<String>,
        column: impl Into<String>,
        statement: Arc<MappedStatement>,
        target: TargetType,
    ) -> Self {
        Self {
            property: property.into(),
            column: column.into(),
            statement,
            target,
        }
    }
}

/// Row materializer that also resolves nested selects, keyed by the id of
/// the statement whose rows carry them.
///
/// A nested key already present in the local cache (completed or still
/// loading) is handed to [`Executor::defer_load`]; anything else is queried
/// right away.
#[derive(Debug, Default)]
pub struct NestedSelectMaterializer {
    nested: HashMap<String, Vec<NestedSelect>>,
}

impl NestedSelectMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nested(mut self, statement_id: impl Into<String>, nested: NestedSelect) -> Self {
        self.nested.entry(statement_id.into()).or_default().push(nested);
        self
    }

    fn resolve(&self, object: &ObjectRef, nested: &NestedSelect, executor: &mut Executor) -> Result<()> {
        let parameter = object.get(&nested.column).unwrap_or_default();
        let ms = &nested.statement;
        let bound_sql = ms.bound_sql();
        let key = executor.create_cache_key(ms, &parameter, RowBounds::default(), &bound_sql)?;

        if executor.is_cached(&key)? {
            return executor.defer_load(object.clone(), &nested.property, key, nested.target);
        }
        let list = executor.query_with_key(ms, &parameter, RowBounds::default(), None, key, &bound_sql)?;
        object.set(nested.property.clone(), extract_object_from_list(list, nested.target)?);
        Ok(())
    }
}

impl ResultMaterializer for NestedSelectMaterializer {
    fn materialize(
        &self,
        rows: Vec<Record>,
        ms: &MappedStatement,
        executor: &mut Executor,
    ) -> Result<Vec<Value>> {
        let nested = self.nested.get(&ms.id).map(Vec::as_slice).unwrap_or_default();
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let object = ObjectRef::new(row);
            for select in nested {
                self.resolve(&object, select, executor)?;
            }
            results.push(Value::Object(object));
        }
        Ok(results)
    }
}
