//! Output tree: host primitives and the slotmap-backed reference host.

pub mod host;
pub mod node;
pub mod tree;

pub use host::{Host, Mutation};
pub use node::{NodeData, NodeId, NodeKind};
pub use tree::Dom;
