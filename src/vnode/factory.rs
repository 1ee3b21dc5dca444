//! Description node factory: `h()`, `text()`, the attribute bag, child flattening.
//!
//! The factory performs no validation. It only separates the structural keys
//! (`key`, `ref`, `children`) from pass-through attributes, flattens nested
//! child lists one level, merges adjacent text, and hands every constructed
//! node to the debug hook chain.

use std::rc::Rc;

use super::debug;
use super::node::{ComponentRef, Element, Key, NodeRef, Props, VNode};
use crate::component::Component;
use crate::dom::node::NodeId;
use crate::value::{Callback, Event, Map, RefCallback, Value};

const KEY: &str = "key";
const REF: &str = "ref";
const CHILDREN: &str = "children";

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// First argument to [`h`]: a host tag or a component definition.
#[derive(Debug, Clone)]
pub enum NodeType {
    Tag(Rc<str>),
    /// `None` models an unresolved reference.
    Component(Option<Rc<Component>>),
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        NodeType::Tag(Rc::from(tag))
    }
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        NodeType::Tag(Rc::from(tag))
    }
}

impl From<Rc<Component>> for NodeType {
    fn from(def: Rc<Component>) -> Self {
        NodeType::Component(Some(def))
    }
}

impl From<&Rc<Component>> for NodeType {
    fn from(def: &Rc<Component>) -> Self {
        NodeType::Component(Some(def.clone()))
    }
}

impl From<Option<Rc<Component>>> for NodeType {
    fn from(def: Option<Rc<Component>>) -> Self {
        NodeType::Component(def)
    }
}

// ---------------------------------------------------------------------------
// Attrs
// ---------------------------------------------------------------------------

/// Untyped attribute bag accepted by [`h`].
///
/// Later entries with the same name win.
#[derive(Debug, Clone, Default)]
pub struct Attrs(Vec<(String, Value)>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute (builder).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    /// Set the `key` attribute.
    pub fn key(self, key: impl Into<Value>) -> Self {
        self.with(KEY, key)
    }

    /// Set the `ref` attribute to a callback.
    pub fn node_ref(self, f: impl Fn(Option<NodeId>) + 'static) -> Self {
        self.with(REF, RefCallback::new(f))
    }

    /// Attach a listener as the `on<event>` attribute.
    pub fn on(self, event: &str, f: impl Fn(&Event) + 'static) -> Self {
        self.with(format!("on{event}"), Callback::new(f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Child
// ---------------------------------------------------------------------------

/// A child argument: one node, a list to flatten, or nothing.
#[derive(Debug, Clone)]
pub enum Child {
    Node(VNode),
    Many(Vec<VNode>),
    Empty,
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<Vec<VNode>> for Child {
    fn from(nodes: Vec<VNode>) -> Self {
        Child::Many(nodes)
    }
}

impl From<Option<VNode>> for Child {
    fn from(node: Option<VNode>) -> Self {
        node.map_or(Child::Empty, Child::Node)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Node(VNode::from(s))
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Node(VNode::from(s))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build a text description node.
pub fn text(content: impl Into<Rc<str>>) -> VNode {
    VNode::Text(content.into())
}

/// Build a description node from a tag or component, attributes, and children.
///
/// ```ignore
/// let list = h("ul", Attrs::new().with("class", "items"), [
///     h("li", Attrs::new().key("a"), ["first"]),
///     h("li", Attrs::new().key("b"), ["second"]),
/// ]);
/// ```
pub fn h<C: Into<Child>>(
    node_type: impl Into<NodeType>,
    attrs: Attrs,
    children: impl IntoIterator<Item = C>,
) -> VNode {
    let children = flatten(children);

    let mut key = None;
    let mut node_ref = None;
    let mut attributes = Map::new();
    for (name, value) in attrs.0 {
        match name.as_str() {
            KEY => key = Some(Key::from_value(&value)),
            REF => node_ref = Some(NodeRef::from_value(value)),
            CHILDREN => {}
            _ => attributes.insert(name, value),
        }
    }

    let node = match node_type.into() {
        NodeType::Tag(tag) => VNode::Element(Rc::new(Element {
            tag,
            attributes,
            children,
            key,
            node_ref,
        })),
        NodeType::Component(component) => VNode::Component(Rc::new(ComponentRef {
            component,
            props: Props::from_parts(attributes, children),
            key,
            node_ref,
        })),
    };

    debug::notify(&node);
    node
}

/// Flatten one level and merge adjacent text children.
fn flatten<C: Into<Child>>(children: impl IntoIterator<Item = C>) -> Vec<VNode> {
    let mut out: Vec<VNode> = Vec::new();
    for child in children {
        match child.into() {
            Child::Node(node) => push_child(&mut out, node),
            Child::Many(nodes) => {
                for node in nodes {
                    push_child(&mut out, node);
                }
            }
            Child::Empty => {}
        }
    }
    out
}

fn push_child(out: &mut Vec<VNode>, node: VNode) {
    if let (Some(VNode::Text(prev)), VNode::Text(next)) = (out.last(), &node) {
        let merged: Rc<str> = Rc::from(format!("{prev}{next}"));
        if let Some(last) = out.last_mut() {
            *last = VNode::Text(merged);
        }
        return;
    }
    out.push(node);
}
