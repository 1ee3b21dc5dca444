//! In-memory reference host: slotmap arena with a mutation log.

use slotmap::{SecondaryMap, SlotMap};

use super::host::{Host, Mutation};
use super::node::{NodeData, NodeId, NodeKind};
use crate::value::{Callback, Event, Value};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// An in-memory output tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// Every [`Host`] primitive applied through the trait is appended to a
/// mutation log that tests can inspect and drain.
#[derive(Default)]
pub struct Dom {
    nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    log: Vec<Mutation>,
}

impl Dom {
    /// Create an empty DOM.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container element to render into.
    ///
    /// Containers are set up by the host, not the reconciler, so their
    /// creation is not logged.
    pub fn container(&mut self, tag: &str) -> NodeId {
        self.create(NodeData::element(tag))
    }

    fn create(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent_id = self.parent.remove(id)?;
        let siblings = self.children.get_mut(parent_id)?;
        let index = siblings.iter().position(|&child| child == id)?;
        siblings.remove(index);
        Some((parent_id, index))
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the `NodeData` for the removed node, or `None` if it didn't exist.
    pub fn remove_subtree(&mut self, id: NodeId) -> Option<NodeData> {
        if !self.nodes.contains_key(id) {
            return None;
        }

        self.detach(id);

        let mut removed_root_data = None;
        for current in self.walk_depth_first(id) {
            self.children.remove(current);
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }

        removed_root_data
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Number of nodes in the DOM, containers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DOM is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// The listener attached to `node` for `event`, if any.
    pub fn listener(&self, node: NodeId, event: &str) -> Option<Callback> {
        self.nodes.get(node)?.listener(event).cloned()
    }

    /// Deliver `event` to the listener on its target node.
    ///
    /// Returns `false` if no listener is attached.
    pub fn dispatch(&self, event: &Event) -> bool {
        match self.listener(event.target, &event.name) {
            Some(listener) => {
                listener.call(event);
                true
            }
            None => false,
        }
    }

    /// All mutations applied since creation or the last drain.
    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    /// Drain and return the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }
}

impl Host for Dom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = self.create(NodeData::element(tag));
        self.log.push(Mutation::CreateElement {
            node,
            tag: tag.to_owned(),
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let node = self.create(NodeData::text(text));
        self.log.push(Mutation::CreateText {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(data) = self.nodes.get_mut(node) {
            data.kind = NodeKind::Text(text.to_owned());
            self.log.push(Mutation::SetText {
                node,
                text: text.to_owned(),
            });
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &Value) {
        if let Some(data) = self.nodes.get_mut(node) {
            data.attributes.insert(name.to_owned(), value.clone());
            self.log.push(Mutation::SetAttribute {
                node,
                name: name.to_owned(),
                value: value.clone(),
            });
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(data) = self.nodes.get_mut(node) {
            if data.attributes.remove(name).is_some() {
                self.log.push(Mutation::RemoveAttribute {
                    node,
                    name: name.to_owned(),
                });
            }
        }
    }

    fn add_listener(&mut self, node: NodeId, event: &str, listener: Callback) {
        if let Some(data) = self.nodes.get_mut(node) {
            // Swapping the handler of an already bound event is not logged.
            if data.listeners.insert(event.to_owned(), listener).is_none() {
                self.log.push(Mutation::AddListener {
                    node,
                    event: event.to_owned(),
                });
            }
        }
    }

    fn remove_listener(&mut self, node: NodeId, event: &str) {
        if let Some(data) = self.nodes.get_mut(node) {
            if data.listeners.remove(event).is_some() {
                self.log.push(Mutation::RemoveListener {
                    node,
                    event: event.to_owned(),
                });
            }
        }
    }

    fn insert(&mut self, parent: NodeId, child: NodeId, index: usize) {
        debug_assert!(self.nodes.contains_key(parent), "parent node does not exist");
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }
        let moved = matches!(self.detach(child), Some((old_parent, _)) if old_parent == parent);
        let Some(siblings) = self.children.get_mut(parent) else {
            return;
        };
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.parent.insert(child, parent);
        self.log.push(if moved {
            Mutation::Move {
                parent,
                node: child,
                index,
            }
        } else {
            Mutation::Insert {
                parent,
                node: child,
                index,
            }
        });
    }

    fn remove(&mut self, node: NodeId) {
        if self.remove_subtree(node).is_some() {
            self.log.push(Mutation::Remove { node });
        }
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).get(index).copied()
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.children(parent).len()
    }

    fn position(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(node)?;
        let index = self.children(parent).iter().position(|&c| c == node)?;
        Some((parent, index))
    }
}
