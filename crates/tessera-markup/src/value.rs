//! Prop values carried by elements and component invocations.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number};

use crate::node::Node;

/// An event handler stored in a prop.
///
/// Handlers never run during serialization. A live instance calls them with its
/// mutable state when an event is dispatched.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&mut Props) + Send + Sync>);

impl Callback {
    /// Wrap a handler closure.
    pub fn new(handler: impl Fn(&mut Props) + Send + Sync + 'static) -> Self {
        Self(Arc::new(handler))
    }

    /// Invoke the handler against instance state.
    pub fn call(&self, state: &mut Props) {
        (self.0)(state)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// A single prop value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Props),
    /// Something callable, e.g. an `onClick` handler.
    Callback(Callback),
    /// A nested component tree, e.g. a `children` prop.
    Node(Node),
}

impl Value {
    /// Whether this value is a callable handler.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callback(_))
    }

    /// Get as string if it's a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as integer if it's an integral number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Get as nested props if it's an object.
    pub fn as_object(&self) -> Option<&Props> {
        match self {
            Value::Object(props) => Some(props),
            _ => None,
        }
    }

    /// Coerce to text the way string interpolation would.
    ///
    /// Returns `None` for callables and nested trees, which have no data form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(number_to_text(n)),
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Null => String::new(),
                        other => other.to_text().unwrap_or_default(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::Object(props) => Some(serde_json::Value::Object(props.to_json()).to_string()),
            Value::Callback(_) | Value::Node(_) => None,
        }
    }

    /// Convert to plain JSON data.
    ///
    /// Callables and nested trees have no JSON form and yield `None`. Inside
    /// objects they are dropped; inside arrays they become `null`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => Some(serde_json::Value::Number(n.clone())),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Array(items) => Some(serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(props) => Some(serde_json::Value::Object(props.to_json())),
            Value::Callback(_) | Value::Node(_) => None,
        }
    }

    /// Build a value from plain JSON data.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(Props::from_json(map)),
        }
    }
}

/// Format a number the way string interpolation prints it: integral values
/// carry no fractional part.
pub fn number_to_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! integer_values {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

integer_values!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<Props> for Value {
    fn from(props: Props) -> Self {
        Value::Object(props)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Callback> for Value {
    fn from(callback: Callback) -> Self {
        Value::Callback(callback)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

/// An ordered property mapping.
///
/// Iteration follows insertion order. Re-inserting an existing key replaces
/// the value in place.
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: Vec<(String, Value)>,
}

impl Props {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Props::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the previous one for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Look up an integer value by key.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Return these props with `overrides` applied on top; overrides win on
    /// key collision.
    pub fn merged(&self, overrides: &Props) -> Props {
        let mut merged = self.clone();
        for (key, value) in overrides.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }

    /// Convert the data-carrying entries to a JSON object.
    pub fn to_json(&self) -> Map<String, serde_json::Value> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
            .collect()
    }

    /// Build props from a JSON object, keeping its key order.
    pub fn from_json(map: Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}
