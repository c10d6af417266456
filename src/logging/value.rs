//! Structured payload values.
//!
//! # Responsibilities
//! - Represent call data and context as JSON-constrained values
//! - Give containers an identity so aliases and self-references can be built
//! - Serialize with cycle detection at the serialization boundary
//!
//! # Design Decisions
//! - Containers are `Shared` nodes (`Arc<RwLock<_>>`); cloning a value clones
//!   the handle, not the contents
//! - Objects keep insertion order (`IndexMap`), which makes key order part of
//!   the emitted line
//! - `Opaque` leaves (dates, URLs, ...) are never traversed and serialize
//!   through their `Display` output

use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use serde::ser::{self, Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

/// Ordered string-keyed map of values.
pub type LogMap = IndexMap<String, LogValue>;

/// A reference-counted container node with identity.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    #[cfg(test)]
    pub(crate) fn downgrade(&self) -> std::sync::Weak<RwLock<T>> {
        Arc::downgrade(&self.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// Contents are not printed: a node may contain itself.
impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:#x})", self.addr())
    }
}

/// A JSON-serializable value.
#[derive(Clone)]
pub enum LogValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Shared<Vec<LogValue>>),
    Object(Shared<LogMap>),
    /// Atomic leaf written as its `Display` text.
    Opaque(Arc<dyn fmt::Display + Send + Sync>),
}

impl LogValue {
    pub fn array(items: Vec<LogValue>) -> Self {
        LogValue::Array(Shared::new(items))
    }

    pub fn object(map: LogMap) -> Self {
        LogValue::Object(Shared::new(map))
    }

    pub fn opaque<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        LogValue::Opaque(Arc::new(value))
    }

    /// Converts to a `serde_json::Value`, failing on cyclic structures.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Debug for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Null => f.write_str("Null"),
            LogValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            LogValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            LogValue::String(s) => f.debug_tuple("String").field(s).finish(),
            LogValue::Array(node) => f.debug_tuple("Array").field(node).finish(),
            LogValue::Object(node) => f.debug_tuple("Object").field(node).finish(),
            LogValue::Opaque(value) => write!(f, "Opaque({value})"),
        }
    }
}

impl Serialize for LogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ancestors = RefCell::new(Vec::new());
        Guarded {
            value: self,
            ancestors: &ancestors,
        }
        .serialize(serializer)
    }
}

/// Serializes a value while tracking the containers currently being written.
struct Guarded<'a> {
    value: &'a LogValue,
    ancestors: &'a RefCell<Vec<usize>>,
}

/// Pops its node off the ancestor stack when dropped.
struct Visit<'a> {
    ancestors: &'a RefCell<Vec<usize>>,
}

impl Drop for Visit<'_> {
    fn drop(&mut self) {
        self.ancestors.borrow_mut().pop();
    }
}

impl<'a> Guarded<'a> {
    fn enter<E: ser::Error>(&self, addr: usize) -> Result<Visit<'a>, E> {
        let mut stack = self.ancestors.borrow_mut();
        if stack.contains(&addr) {
            return Err(E::custom("cannot serialize cyclic structure"));
        }
        stack.push(addr);
        Ok(Visit {
            ancestors: self.ancestors,
        })
    }
}

impl Serialize for Guarded<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            LogValue::Null => serializer.serialize_unit(),
            LogValue::Bool(b) => serializer.serialize_bool(*b),
            LogValue::Number(n) => n.serialize(serializer),
            LogValue::String(s) => serializer.serialize_str(s),
            LogValue::Opaque(value) => {
                let mut text = String::new();
                write!(text, "{value}").map_err(|_| {
                    <S::Error as ser::Error>::custom("opaque value failed to format")
                })?;
                serializer.serialize_str(&text)
            }
            LogValue::Array(node) => {
                let _visit = self.enter::<S::Error>(node.addr())?;
                let items = node.read();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(&Guarded {
                        value: item,
                        ancestors: self.ancestors,
                    })?;
                }
                seq.end()
            }
            LogValue::Object(node) => {
                let _visit = self.enter::<S::Error>(node.addr())?;
                let entries = node.read();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries.iter() {
                    map.serialize_entry(key, &Guarded {
                        value,
                        ancestors: self.ancestors,
                    })?;
                }
                map.end()
            }
        }
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => LogValue::Null,
            serde_json::Value::Bool(b) => LogValue::Bool(b),
            serde_json::Value::Number(n) => LogValue::Number(n),
            serde_json::Value::String(s) => LogValue::String(s),
            serde_json::Value::Array(items) => {
                LogValue::array(items.into_iter().map(LogValue::from).collect())
            }
            serde_json::Value::Object(map) => LogValue::object(map_from_json(map)),
        }
    }
}

fn map_from_json(map: serde_json::Map<String, serde_json::Value>) -> LogMap {
    map.into_iter().map(|(k, v)| (k, LogValue::from(v))).collect()
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        LogValue::Bool(value)
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::String(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::String(value)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogValue {
                fn from(value: $ty) -> Self {
                    LogValue::Number(Number::from(value))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Non-finite floats become `Null`.
impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(LogValue::Null, LogValue::Number)
    }
}

impl From<LogMap> for LogValue {
    fn from(map: LogMap) -> Self {
        LogValue::object(map)
    }
}

impl From<Vec<LogValue>> for LogValue {
    fn from(items: Vec<LogValue>) -> Self {
        LogValue::array(items)
    }
}

impl From<Shared<LogMap>> for LogValue {
    fn from(node: Shared<LogMap>) -> Self {
        LogValue::Object(node)
    }
}

impl From<Shared<Vec<LogValue>>> for LogValue {
    fn from(node: Shared<Vec<LogValue>>) -> Self {
        LogValue::Array(node)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(LogValue::Null, Into::into)
    }
}

/// Structured data for one logging call or a context merge.
#[derive(Debug, Clone, Default)]
pub struct Fields(Shared<LogMap>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<LogValue>) {
        self.0.write().insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// The underlying node, shared with every value built from it.
    pub fn node(&self) -> &Shared<LogMap> {
        &self.0
    }
}

impl From<Shared<LogMap>> for Fields {
    fn from(node: Shared<LogMap>) -> Self {
        Self(node)
    }
}

impl From<LogMap> for Fields {
    fn from(map: LogMap) -> Self {
        Self(Shared::new(map))
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Fields {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from(map_from_json(map))
    }
}

/// Anything accepted as the data argument of a logging call.
pub trait IntoFields {
    fn into_fields(self) -> Option<Fields>;
}

impl IntoFields for () {
    fn into_fields(self) -> Option<Fields> {
        None
    }
}

impl IntoFields for Fields {
    fn into_fields(self) -> Option<Fields> {
        Some(self)
    }
}

impl IntoFields for LogMap {
    fn into_fields(self) -> Option<Fields> {
        Some(Fields::from(self))
    }
}

impl IntoFields for Shared<LogMap> {
    fn into_fields(self) -> Option<Fields> {
        Some(Fields::from(self))
    }
}

impl IntoFields for serde_json::Map<String, serde_json::Value> {
    fn into_fields(self) -> Option<Fields> {
        Some(Fields::from(self))
    }
}

/// Only JSON objects carry fields; any other JSON value is treated as absent.
impl IntoFields for serde_json::Value {
    fn into_fields(self) -> Option<Fields> {
        match self {
            serde_json::Value::Object(map) => Some(Fields::from(map)),
            _ => None,
        }
    }
}

impl<T: IntoFields> IntoFields for Option<T> {
    fn into_fields(self) -> Option<Fields> {
        self.and_then(IntoFields::into_fields)
    }
}
