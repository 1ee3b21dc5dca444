//! Record of what is currently rendered at each tree position.

use std::rc::Rc;

use crate::component::instance::{InstanceId, Registry};
use crate::component::Component;
use crate::dom::NodeId;
use crate::vnode::{Element, Key};

/// The engine's memory of one rendered position.
///
/// Elements keep the description they were last rendered from, so the next
/// diff compares descriptions rather than reading the host back. Components
/// point at their instance, whose own `rendered` field holds the subtree.
#[derive(Debug)]
pub(crate) enum Mounted {
    Text {
        node: NodeId,
        text: Rc<str>,
    },
    Element {
        node: NodeId,
        element: Rc<Element>,
        children: Vec<Mounted>,
    },
    Component {
        id: InstanceId,
        component: Rc<Component>,
        key: Option<Key>,
    },
}

impl Mounted {
    pub fn key(&self) -> Option<&Key> {
        match self {
            Mounted::Text { .. } => None,
            Mounted::Element { element, .. } => element.key.as_ref(),
            Mounted::Component { key, .. } => key.as_ref(),
        }
    }

    /// The host node this position occupies.
    ///
    /// A component resolves through its instance down to the first host node
    /// of its rendered output.
    pub fn node(&self, registry: &Registry) -> Option<NodeId> {
        match self {
            Mounted::Text { node, .. } | Mounted::Element { node, .. } => Some(*node),
            Mounted::Component { id, .. } => {
                let instance = registry.get(*id)?;
                let data = instance.data();
                data.rendered.as_ref()?.node(registry)
            }
        }
    }
}
