//! Description tree model: immutable nodes, the `h()` factory, debug hooks.

pub mod debug;
pub mod factory;
pub mod node;

pub use factory::{h, text, Attrs, Child, NodeType};
pub use node::{ComponentRef, Element, Key, NodeKind, NodeRef, Props, VNode};
