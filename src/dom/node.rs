//! Output node types: NodeId, NodeData.

use std::collections::BTreeMap;
use std::rc::Rc;

use slotmap::new_key_type;

use crate::value::{Callback, Value};

new_key_type! {
    /// Unique identifier for an output node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// What kind of output node this is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Element with a tag name.
    Element { tag: Rc<str> },
    /// Text content.
    Text(String),
}

/// Data associated with a single output node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    /// Pass-through attributes (elements only).
    pub attributes: BTreeMap<String, Value>,
    /// Attached event listeners keyed by event name (elements only).
    pub listeners: BTreeMap<String, Callback>,
}

impl NodeData {
    /// Create element data with no attributes.
    pub fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element { tag: Rc::from(tag) },
            attributes: BTreeMap::new(),
            listeners: BTreeMap::new(),
        }
    }

    /// Create text data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(text.into()),
            attributes: BTreeMap::new(),
            listeners: BTreeMap::new(),
        }
    }

    /// Set an attribute (builder).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Tag name, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Text content, if this is a text node.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn listener(&self, event: &str) -> Option<&Callback> {
        self.listeners.get(event)
    }
}
