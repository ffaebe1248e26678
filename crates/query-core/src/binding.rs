//! Statement binding primitives
//!
//! The SQL text and the ordered list of parameter mappings for one
//! execution, plus the pagination bounds that accompany it.

use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a statement does to the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

/// How a statement is handed to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatementType {
    Statement,
    #[default]
    Prepared,
    Callable,
}

/// Direction of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

/// A named placeholder in the SQL text and its direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMapping {
    pub property: String,
    pub mode: ParameterMode,
}

impl ParameterMapping {
    pub fn new(property: impl Into<String>, mode: ParameterMode) -> Self {
        Self {
            property: property.into(),
            mode,
        }
    }

    pub fn input(property: impl Into<String>) -> Self {
        Self::new(property, ParameterMode::In)
    }

    pub fn output(property: impl Into<String>) -> Self {
        Self::new(property, ParameterMode::Out)
    }

    pub fn in_out(property: impl Into<String>) -> Self {
        Self::new(property, ParameterMode::InOut)
    }
}

/// Offset/limit pagination applied to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowBounds {
    pub offset: i64,
    pub limit: i64,
}

impl RowBounds {
    pub const NO_ROW_OFFSET: i64 = 0;
    pub const NO_ROW_LIMIT: i64 = i32::MAX as i64;

    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::new(Self::NO_ROW_OFFSET, Self::NO_ROW_LIMIT)
    }
}

/// SQL text ready for execution together with its ordered parameter mappings
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
    additional_parameters: BTreeMap<String, Value>,
}

impl BoundSql {
    pub fn new(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self {
            sql: sql.into(),
            parameter_mappings,
            additional_parameters: BTreeMap::new(),
        }
    }

    /// Attach a value that shadows the parameter object for `name`
    pub fn with_additional_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.additional_parameters.insert(name.into(), value);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn has_additional_parameter(&self, name: &str) -> bool {
        self.additional_parameters.contains_key(name)
    }

    pub fn additional_parameter(&self, name: &str) -> Option<&Value> {
        self.additional_parameters.get(name)
    }

    /// Resolve the value bound to `mapping`.
    ///
    /// Additional parameters win, then a scalar parameter is bound as-is,
    /// then object parameters are read by property name. Anything missing
    /// binds as `Null`.
    pub fn resolve_parameter(&self, mapping: &ParameterMapping, parameter: &Value) -> Value {
        if let Some(value) = self.additional_parameters.get(&mapping.property) {
            return value.clone();
        }
        match parameter {
            Value::Null => Value::Null,
            Value::Object(object) => object.get(&mapping.property).unwrap_or_default(),
            scalar => scalar.clone(),
        }
    }

    /// Values for every non-OUT mapping, in binding order
    pub fn input_values(&self, parameter: &Value) -> Vec<Value> {
        self.parameter_mappings
            .iter()
            .filter(|m| m.mode != ParameterMode::Out)
            .map(|m| self.resolve_parameter(m, parameter))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{record, ObjectRef};

    #[test]
    fn test_default_row_bounds() {
        let bounds = RowBounds::default();
        assert_eq!(bounds.offset, 0);
        assert_eq!(bounds.limit, i32::MAX as i64);
    }

    #[test]
    fn test_scalar_parameter_binds_directly() {
        let bound = BoundSql::new(
            "SELECT * FROM blog WHERE id = ?",
            vec![ParameterMapping::input("id")],
        );
        assert_eq!(bound.input_values(&Value::Int64(7)), vec![Value::Int64(7)]);
    }

    #[test]
    fn test_object_parameter_resolved_by_property() {
        let bound = BoundSql::new(
            "SELECT * FROM post WHERE blog_id = ? AND section = ?",
            vec![
                ParameterMapping::input("blog_id"),
                ParameterMapping::input("section"),
            ],
        );
        let param = Value::Object(ObjectRef::new(record([("blog_id", 3)])));
        assert_eq!(
            bound.input_values(&param),
            vec![Value::Int64(3), Value::Null]
        );
    }

    #[test]
    fn test_additional_parameter_shadows_object() {
        let bound = BoundSql::new("SELECT ?", vec![ParameterMapping::input("id")])
            .with_additional_parameter("id", Value::Int64(99));
        let param = Value::Object(ObjectRef::new(record([("id", 1)])));
        assert!(bound.has_additional_parameter("id"));
        assert_eq!(bound.input_values(&param), vec![Value::Int64(99)]);
    }

    #[test]
    fn test_out_parameters_are_not_inputs() {
        let bound = BoundSql::new(
            "{call count_posts(?, ?)}",
            vec![
                ParameterMapping::input("blog_id"),
                ParameterMapping::output("total"),
            ],
        );
        let param = Value::Object(ObjectRef::new(record([("blog_id", 1)])));
        assert_eq!(bound.input_values(&param), vec![Value::Int64(1)]);
    }
}
