//! Composite cache keys
//!
//! A key is the ordered list of everything that identifies one query
//! execution: statement id, offset, limit, SQL text, each input parameter
//! value and the environment id. Hash and checksum are maintained
//! incrementally as components are appended.
//!
//! Components are frozen on append: object parameters are copied property
//! by property, so later writes to the caller's object never reach a key
//! that is already stored in a cache.

use ahash::AHasher;
use query_core::{ObjectRef, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

const DEFAULT_MULTIPLIER: i64 = 37;
const DEFAULT_HASHCODE: i64 = 17;

/// Immutable copy of one key component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyComponent {
    Null,
    Boolean(bool),
    Int64(i64),
    /// Bit pattern, so equality agrees with hashing
    Float64(u64),
    Utf8(String),
    Binary(Vec<u8>),
    List(Vec<KeyComponent>),
    /// Properties in name order. A back-reference to an object already
    /// being copied is frozen as an empty object.
    Object(Vec<(String, KeyComponent)>),
}

impl KeyComponent {
    pub fn is_null(&self) -> bool {
        matches!(self, KeyComponent::Null)
    }

    fn freeze(value: &Value, visiting: &mut Vec<ObjectRef>) -> Self {
        match value {
            Value::Null => KeyComponent::Null,
            Value::Boolean(v) => KeyComponent::Boolean(*v),
            Value::Int64(v) => KeyComponent::Int64(*v),
            Value::Float64(v) => KeyComponent::Float64(v.to_bits()),
            Value::Utf8(v) => KeyComponent::Utf8(v.clone()),
            Value::Binary(v) => KeyComponent::Binary(v.clone()),
            Value::List(values) => KeyComponent::List(
                values.iter().map(|v| Self::freeze(v, visiting)).collect(),
            ),
            Value::Object(object) => {
                if visiting.iter().any(|seen| seen.ptr_eq(object)) {
                    return KeyComponent::Object(Vec::new());
                }
                visiting.push(object.clone());
                let properties = object
                    .snapshot()
                    .into_iter()
                    .map(|(name, v)| {
                        let frozen = Self::freeze(&v, visiting);
                        (name, frozen)
                    })
                    .collect();
                visiting.pop();
                KeyComponent::Object(properties)
            }
        }
    }
}

impl From<&Value> for KeyComponent {
    fn from(value: &Value) -> Self {
        Self::freeze(value, &mut Vec::new())
    }
}

impl From<Value> for KeyComponent {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyComponent::Null => write!(f, "null"),
            KeyComponent::Boolean(v) => write!(f, "{}", v),
            KeyComponent::Int64(v) => write!(f, "{}", v),
            KeyComponent::Float64(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyComponent::Utf8(v) => write!(f, "{}", v),
            KeyComponent::Binary(v) => write!(f, "{:?}", v),
            KeyComponent::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            KeyComponent::Object(properties) => {
                write!(f, "{{")?;
                for (i, (name, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Order-sensitive key derived from a statement and its bound parameters
#[derive(Debug, Clone)]
pub struct CacheKey {
    multiplier: i64,
    hashcode: i64,
    checksum: i64,
    count: usize,
    components: Vec<KeyComponent>,
}

impl CacheKey {
    pub fn new() -> Self {
        Self {
            multiplier: DEFAULT_MULTIPLIER,
            hashcode: DEFAULT_HASHCODE,
            checksum: 0,
            count: 0,
            components: Vec::new(),
        }
    }

    /// Create a key from components, appended in iteration order
    pub fn from_components<I, V>(components: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut key = Self::new();
        key.update_all(components);
        key
    }

    /// Append one component, copying it out of any shared object
    pub fn update(&mut self, component: impl Into<Value>) {
        let component: Value = component.into();
        let component = KeyComponent::from(&component);
        let base = component_hash(&component);

        self.count += 1;
        self.checksum = self.checksum.wrapping_add(base);
        let base = base.wrapping_mul(self.count as i64);
        self.hashcode = self.multiplier.wrapping_mul(self.hashcode).wrapping_add(base);

        self.components.push(component);
    }

    pub fn update_all<I, V>(&mut self, components: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for component in components {
            self.update(component);
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn components(&self) -> &[KeyComponent] {
        &self.components
    }

    pub fn hashcode(&self) -> i64 {
        self.hashcode
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Lists hash element-wise through `Value`'s `Hash`, never by identity.
fn component_hash(component: &KeyComponent) -> i64 {
    if component.is_null() {
        return 1;
    }
    let mut hasher = AHasher::default();
    component.hash(&mut hasher);
    hasher.finish() as i64
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
            && self.checksum == other.checksum
            && self.hashcode == other.hashcode
            && self.components == other.components
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.hashcode);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for component in &self.components {
            write!(f, ":{}", component)?;
        }
        Ok(())
    }
}
