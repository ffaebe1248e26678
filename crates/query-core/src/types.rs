use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A raw row as returned by a row executor, keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// A single cell, bound parameter, or materialized result value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Binary(Vec<u8>),
    List(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int64(_) => 2,
            Value::Float64(_) => 3,
            Value::Utf8(_) => 4,
            Value::Binary(_) => 5,
            Value::List(_) => 6,
            Value::Object(_) => 7,
        }
    }
}

// Floats compare by bit pattern so that equality agrees with hashing.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.discriminant());
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Utf8(v) => v.hash(state),
            Value::Binary(v) => v.hash(state),
            Value::List(v) => v.hash(state),
            Value::Object(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Utf8(v) => write!(f, "{}", v),
            Value::Binary(v) => write!(f, "{:?}", v),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Shared, mutable handle to a materialized result object.
///
/// Nested result mapping writes properties into objects after they have been
/// handed out (deferred loads), so objects are reference-counted and locked
/// per access. Parent/child mappings can form cycles; every traversal
/// (`Debug`, `Hash`, `PartialEq`, `Serialize`) uses `try_lock` and treats an
/// object that is already being visited as opaque, which cuts the cycle.
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<Mutex<Record>>);

impl ObjectRef {
    pub fn new(record: Record) -> Self {
        Self(Arc::new(Mutex::new(record)))
    }

    pub fn get(&self, property: &str) -> Option<Value> {
        self.0.lock().get(property).cloned()
    }

    pub fn set(&self, property: impl Into<String>, value: Value) {
        self.0.lock().insert(property.into(), value);
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.lock().contains_key(property)
    }

    /// Copy of the current property map.
    pub fn snapshot(&self) -> Record {
        self.0.lock().clone()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Record> for ObjectRef {
    fn from(record: Record) -> Self {
        Self::new(record)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.0.try_lock(), other.0.try_lock()) {
            (Some(a), Some(b)) => *a == *b,
            _ => false,
        }
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(record) = self.0.try_lock() {
            for (name, value) in record.iter() {
                name.hash(state);
                value.hash(state);
            }
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Some(record) => f.debug_map().entries(record.iter()).finish(),
            None => write!(f, "{{..}}"),
        }
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.try_lock() {
            Some(record) => record.serialize(serializer),
            None => Record::new().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ObjectRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Record::deserialize(deserializer).map(ObjectRef::new)
    }
}

/// Build a [`Record`] from `(column, value)` pairs.
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_list_equality_is_element_wise() {
        let a = Value::List(vec![Value::Int64(1), Value::from("x")]);
        let b = Value::List(vec![Value::Int64(1), Value::from("x")]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_float_nan_equals_itself() {
        let nan = Value::Float64(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash_of(&nan), hash_of(&nan.clone()));
    }

    #[test]
    fn test_object_set_visible_through_clones() {
        let object = ObjectRef::new(record([("id", 1)]));
        let alias = object.clone();
        alias.set("name", Value::from("Alice"));
        assert_eq!(object.get("name"), Some(Value::from("Alice")));
        assert!(object.ptr_eq(&alias));
    }

    #[test]
    fn test_cyclic_object_debug_terminates() {
        let parent = ObjectRef::new(record([("id", 1)]));
        let child = ObjectRef::new(record([("id", 2)]));
        child.set("parent", Value::Object(parent.clone()));
        parent.set("child", Value::Object(child));

        let rendered = format!("{:?}", parent);
        assert!(rendered.contains("{..}"));
    }

    #[test]
    fn test_cyclic_object_serializes_with_cut_back_reference() {
        let parent = ObjectRef::new(record([("id", 1)]));
        parent.set("me", Value::Object(parent.clone()));

        let json = serde_json::to_string(&Value::Object(parent)).unwrap();
        let restored: Value = serde_json::from_str(&json).unwrap();
        let restored = restored.as_object().unwrap().clone();
        assert_eq!(restored.get("id"), Some(Value::Int64(1)));
        let me = restored.get("me").unwrap();
        assert!(me.as_object().unwrap().snapshot().is_empty());
    }

    #[test]
    fn test_display() {
        let value = Value::List(vec![Value::Int64(1), Value::Null, Value::from("a")]);
        assert_eq!(value.to_string(), "[1, null, a]");
    }
}
