//! Description node types: VNode, Key, NodeRef, Props.

use std::fmt;
use std::rc::Rc;

use crate::component::Component;
use crate::value::{Map, RefCallback, Value};

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Stable identity hint for matching children across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Rc<str>);

impl Key {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Rc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a key from an attribute value. Every value kind stringifies.
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Str(s) => Key(s.clone()),
            other => Key::new(other.to_string()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::new(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(Rc::from(s))
    }
}

// ---------------------------------------------------------------------------
// NodeRef
// ---------------------------------------------------------------------------

/// The structural `ref` attribute.
///
/// Anything other than a ref callback is kept as `Malformed` so the engine can
/// reject it at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRef {
    Callback(RefCallback),
    /// A non-invocable value; carries the offending value's type name.
    Malformed(&'static str),
}

impl NodeRef {
    pub(crate) fn from_value(value: Value) -> Self {
        match value {
            Value::Ref(callback) => NodeRef::Callback(callback),
            other => NodeRef::Malformed(other.type_name()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, NodeRef::Malformed(_))
    }
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// Props handed to a component: pass-through values plus children.
#[derive(Debug, Clone)]
pub struct Props {
    values: Map,
    children: Rc<[VNode]>,
}

impl Default for Props {
    fn default() -> Self {
        Self::from_parts(Map::new(), Vec::new())
    }
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(values: Map, children: Vec<VNode>) -> Self {
        Self {
            values,
            children: Rc::from(children),
        }
    }

    /// Add a value (builder).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Map {
        &self.values
    }

    /// Children passed between the component's tags.
    pub fn children(&self) -> &[VNode] {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// VNode
// ---------------------------------------------------------------------------

/// Element-like description: host tag, attributes, children.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: Rc<str>,
    /// Pass-through attributes; never contains `key`, `ref`, or `children`.
    pub attributes: Map,
    pub children: Vec<VNode>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
}

/// Component reference: a definition plus the props to render it with.
#[derive(Debug, Clone)]
pub struct ComponentRef {
    /// `None` when the reference could not be resolved.
    pub component: Option<Rc<Component>>,
    pub props: Props,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
}

/// Immutable description of what should be rendered.
///
/// Cloning is cheap; the payload is shared.
#[derive(Debug, Clone)]
pub enum VNode {
    Text(Rc<str>),
    Element(Rc<Element>),
    Component(Rc<ComponentRef>),
}

/// Discriminant of a [`VNode`], for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
    Component,
}

impl VNode {
    /// The empty placeholder: a text node with no content.
    pub fn empty() -> Self {
        VNode::Text(Rc::from(""))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            VNode::Text(_) => NodeKind::Text,
            VNode::Element(_) => NodeKind::Element,
            VNode::Component(_) => NodeKind::Component,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Text(_) => None,
            VNode::Element(el) => el.key.as_ref(),
            VNode::Component(c) => c.key.as_ref(),
        }
    }

    pub fn node_ref(&self) -> Option<&NodeRef> {
        match self {
            VNode::Text(_) => None,
            VNode::Element(el) => el.node_ref.as_ref(),
            VNode::Component(c) => c.node_ref.as_ref(),
        }
    }

    /// Children of an element, or the children prop of a component.
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Text(_) => &[],
            VNode::Element(el) => &el.children,
            VNode::Component(c) => c.props.children(),
        }
    }

    /// Pass-through attributes (or component prop values).
    pub fn attributes(&self) -> Option<&Map> {
        match self {
            VNode::Text(_) => None,
            VNode::Element(el) => Some(&el.attributes),
            VNode::Component(c) => Some(c.props.values()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VNode::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this is a component reference whose definition is missing.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, VNode::Component(c) if c.component.is_none())
    }

    /// Display name: tag, component name, or `#text`.
    pub fn name(&self) -> &str {
        match self {
            VNode::Text(_) => "#text",
            VNode::Element(el) => &el.tag,
            VNode::Component(c) => c
                .component
                .as_ref()
                .map(|def| def.name())
                .unwrap_or("undefined"),
        }
    }

    /// One-line markup-ish summary, e.g. `<li key="a" class="x">..</li>`.
    pub fn summary(&self) -> String {
        if let VNode::Text(t) = self {
            return format!("{t:?}");
        }
        let name = self.name();
        let mut out = format!("<{name}");
        if let Some(key) = self.key() {
            out.push_str(&format!(" key={:?}", key.as_str()));
        }
        if let Some(attributes) = self.attributes() {
            for (attr, value) in attributes.iter() {
                out.push_str(&format!(" {attr}={:?}", value.to_string()));
            }
        }
        if self.children().is_empty() {
            out.push_str(" />");
        } else {
            out.push_str(&format!(">..</{name}>"));
        }
        out
    }
}

impl From<&str> for VNode {
    fn from(s: &str) -> Self {
        VNode::Text(Rc::from(s))
    }
}

impl From<String> for VNode {
    fn from(s: String) -> Self {
        VNode::Text(Rc::from(s))
    }
}
