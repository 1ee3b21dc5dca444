//! Dynamic values: attribute values, props, state, and context mappings.
//!
//! [`Value`] is the closed set of things an attribute or prop can hold.
//! [`Map`] is the immutable-by-default string-keyed mapping used for props,
//! state, and context; it is cheap to clone (shared `Rc`) and copies on write.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::node::NodeId;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Payload delivered to a listener callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name without the `on` prefix, lowercase (e.g. "click").
    pub name: String,
    /// The output node the listener is attached to.
    pub target: NodeId,
    /// Arbitrary event detail.
    pub detail: Value,
}

impl Event {
    /// Create an event with a `Null` detail.
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: Value::Null,
        }
    }

    /// Attach a detail value (builder).
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Event listener callback. Compared by identity, never by behavior.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
    /// Wrap a closure as a listener.
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the listener.
    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    /// Whether two callbacks are the same closure allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Ref callback: receives the live output node on attach and `None` on detach.
#[derive(Clone)]
pub struct RefCallback(Rc<dyn Fn(Option<NodeId>)>);

impl RefCallback {
    /// Wrap a closure as a ref callback.
    pub fn new(f: impl Fn(Option<NodeId>) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the ref.
    pub fn call(&self, node: Option<NodeId>) {
        (self.0)(node)
    }

    /// Whether two refs are the same closure allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for RefCallback {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for RefCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefCallback(..)")
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically typed attribute / prop / state value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// An event listener (only meaningful on `on*` attributes).
    Callback(Callback),
    /// A ref callback (only meaningful on the `ref` attribute).
    Ref(RefCallback),
}

impl Value {
    /// Short type name used in diagnostics and errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Callback(_) => "callback",
            Value::Ref(_) => "ref",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// Whether this value is invocable in some form.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callback(_) | Value::Ref(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Callback(_) => f.write_str("[callback]"),
            Value::Ref(_) => f.write_str("[ref]"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Callback> for Value {
    fn from(cb: Callback) -> Self {
        Value::Callback(cb)
    }
}

impl From<RefCallback> for Value {
    fn from(r: RefCallback) -> Self {
        Value::Ref(r)
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// String-keyed mapping used for attributes, props, state, and context.
///
/// Clones share storage; mutation copies on write, so a `Map` handed to a
/// render function can never be changed behind its back.
#[derive(Clone, Default, PartialEq)]
pub struct Map(Rc<BTreeMap<String, Value>>);

impl Map {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry (builder).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or overwrite an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Rc::make_mut(&mut self.0).insert(name.into(), value.into());
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        if !self.0.contains_key(name) {
            return None;
        }
        Rc::make_mut(&mut self.0).remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow merge: a new map with `partial`'s entries laid over `self`.
    ///
    /// Neither input is modified.
    pub fn merge(&self, partial: &Map) -> Map {
        if partial.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return partial.clone();
        }
        let mut merged = (*self.0).clone();
        for (k, v) in partial.0.iter() {
            merged.insert(k.clone(), v.clone());
        }
        Map(Rc::new(merged))
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Map(Rc::new(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
