use query_cache::Cache;
use query_core::{BoundSql, ParameterMapping, StatementKind, StatementType};
use std::sync::Arc;

/// A configured statement: id, SQL, parameter mappings and cache flags.
///
/// The id is namespace qualified (`BlogMapper.selectBlog`). `cache` is the
/// shared second-level cache of that namespace, if it has one.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    pub id: String,
    pub kind: StatementKind,
    pub statement_type: StatementType,
    pub sql: String,
    pub parameter_mappings: Vec<ParameterMapping>,
    pub flush_cache_required: bool,
    pub use_cache: bool,
    pub cache: Option<Arc<dyn Cache>>,
}

impl MappedStatement {
    pub fn new(id: impl Into<String>, kind: StatementKind, sql: impl Into<String>) -> Self {
        let is_select = kind == StatementKind::Select;
        Self {
            id: id.into(),
            kind,
            statement_type: StatementType::default(),
            sql: sql.into(),
            parameter_mappings: Vec::new(),
            flush_cache_required: !is_select,
            use_cache: is_select,
            cache: None,
        }
    }

    pub fn select(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Select, sql)
    }

    pub fn insert(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Insert, sql)
    }

    pub fn update(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Update, sql)
    }

    pub fn delete(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Delete, sql)
    }

    pub fn with_parameter(mut self, mapping: ParameterMapping) -> Self {
        self.parameter_mappings.push(mapping);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = statement_type;
        self
    }

    pub fn with_flush_cache(mut self, flush: bool) -> Self {
        self.flush_cache_required = flush;
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn is_callable(&self) -> bool {
        self.statement_type == StatementType::Callable
    }

    pub fn bound_sql(&self) -> BoundSql {
        BoundSql::new(self.sql.clone(), self.parameter_mappings.clone())
    }
}
