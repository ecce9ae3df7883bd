//! Dynamic tagged values fed to template engines.
//!
//! Formatters hand symbol data to rendering templates as [`Value`]s: a
//! closed set of kinds with no implicit conversions. Arrays and objects are
//! cheap reference-counted handles to polymorphic implementations, so
//! formatters can expose lazily computed views without copying the corpus.

use std::fmt;
use std::sync::Arc;

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    String,
    Array,
    Object,
}

/// A dynamic value: null, bool, integer, string, array, or object.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
    Array(Array),
    Object(Object),
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Truthiness: null is false; numbers are nonzero; strings, arrays and
    /// objects are non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => arr.len() > 0,
            Value::Object(obj) => !obj.is_empty(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(arr) => {
                let items: Vec<Value> = (0..arr.len()).map(|i| arr.get(i)).collect();
                f.debug_list().entries(items.iter()).finish()
            }
            Value::Object(obj) => {
                let mut map = f.debug_map();
                for key in obj.keys() {
                    if let Some(value) = obj.get(&key) {
                        map.entry(&key, &value);
                    }
                }
                map.finish()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Array> for Value {
    fn from(arr: Array) -> Self {
        Value::Array(arr)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

/// Implementation behind an [`Array`] handle.
pub trait ArrayImpl: Send + Sync {
    fn len(&self) -> usize;

    /// The element at `index`. Callers stay within `len()`.
    fn get(&self, index: usize) -> Value;
}

/// A reference-counted array of values.
#[derive(Clone)]
pub struct Array(Arc<dyn ArrayImpl>);

impl Array {
    pub fn new(imp: Arc<dyn ArrayImpl>) -> Self {
        Self(imp)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    pub fn get(&self, index: usize) -> Value {
        self.0.get(index)
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self(Arc::new(VecArray(items)))
    }
}

struct VecArray(Vec<Value>);

impl ArrayImpl for VecArray {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> Value {
        self.0[index].clone()
    }
}

/// Implementation behind an [`Object`] handle.
///
/// Key enumeration order is the insertion order observed by the
/// implementation.
pub trait ObjectImpl: Send + Sync {
    fn is_empty(&self) -> bool {
        false
    }

    fn get(&self, key: &str) -> Option<Value>;

    fn keys(&self) -> Vec<String>;
}

/// A reference-counted object with insertion-ordered keys.
#[derive(Clone)]
pub struct Object(Arc<dyn ObjectImpl>);

impl Object {
    pub fn new(imp: Arc<dyn ObjectImpl>) -> Self {
        Self(imp)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.get(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.0.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys()
    }
}

impl From<Vec<(String, Value)>> for Object {
    fn from(entries: Vec<(String, Value)>) -> Self {
        Self(Arc::new(EntryObject(entries)))
    }
}

struct EntryObject(Vec<(String, Value)>);

impl ObjectImpl for EntryObject {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn keys(&self) -> Vec<String> {
        self.0.iter().map(|(k, _)| k.clone()).collect()
    }
}
