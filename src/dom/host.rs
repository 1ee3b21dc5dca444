//! Host abstraction: the primitives the reconciler drives.
//!
//! The engine never assumes a particular output technology. Anything that can
//! create, update, remove, reorder, and attach listeners to nodes can be a
//! [`Host`]. [`Mutation`] names each primitive so hosts can log what was
//! applied.

use crate::value::{Callback, Value};

use super::node::NodeId;

/// Output-tree primitives supplied by the host environment.
///
/// Newly created nodes are detached until [`Host::insert`] places them.
pub trait Host {
    /// Create a detached element node.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Replace the content of a text node.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Set (or overwrite) a pass-through attribute.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &Value);

    /// Remove a pass-through attribute.
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Attach a listener for `event`, replacing any listener already bound
    /// to that event.
    fn add_listener(&mut self, node: NodeId, event: &str, listener: Callback);

    /// Detach the listener for `event`.
    fn remove_listener(&mut self, node: NodeId, event: &str);

    /// Place `child` at `index` among `parent`'s children.
    ///
    /// If `child` is already attached somewhere it is moved. An index past
    /// the end appends.
    fn insert(&mut self, parent: NodeId, child: NodeId, index: usize);

    /// Detach `node` and destroy it together with its subtree.
    fn remove(&mut self, node: NodeId);

    /// The child of `parent` at `index`, if any.
    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId>;

    /// Number of children under `parent`.
    fn child_count(&self, parent: NodeId) -> usize;

    /// The parent of `node` and its index there, if attached.
    fn position(&self, node: NodeId) -> Option<(NodeId, usize)>;
}

/// One applied host primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    SetText { node: NodeId, text: String },
    SetAttribute { node: NodeId, name: String, value: Value },
    RemoveAttribute { node: NodeId, name: String },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
    /// A detached node was attached.
    Insert { parent: NodeId, node: NodeId, index: usize },
    /// An attached node was reordered.
    Move { parent: NodeId, node: NodeId, index: usize },
    Remove { node: NodeId },
}

impl Mutation {
    /// Whether this mutation created a node.
    pub fn is_create(&self) -> bool {
        matches!(self, Mutation::CreateElement { .. } | Mutation::CreateText { .. })
    }

    /// Whether this mutation destroyed a node.
    pub fn is_remove(&self) -> bool {
        matches!(self, Mutation::Remove { .. })
    }

    /// Whether this mutation reordered an existing node.
    pub fn is_move(&self) -> bool {
        matches!(self, Mutation::Move { .. })
    }
}
