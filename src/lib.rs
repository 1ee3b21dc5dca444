//! # gilt-vdom
//!
//! A virtual-tree reconciliation engine with stateful components, batched
//! updates, and error boundaries.
//!
//! Applications describe their UI as immutable [`VNode`] trees built with
//! [`h`]. A [`Renderer`] diffs each new description against what it rendered
//! before and applies the minimal set of mutations to a [`Host`] tree.
//! Components keep state across renders, run lifecycle hooks, and batch their
//! state updates through a per-thread render queue.
//!
//! ## Core Systems
//!
//! - **[`vnode`]**: Description nodes, the `h()` factory, debug hooks
//! - **[`component`]**: Component definitions, lifecycle hooks, instance handles
//! - **[`reconcile`]**: The renderer, tree and child-list diffing, error boundaries
//! - **[`scheduler`]**: The render queue: deduplication, batching, deferred drains
//! - **[`dom`]**: Host primitives and the slotmap-backed reference host
//! - **[`value`]**: Attribute values, maps, callbacks, events
//! - **[`config`]**: Renderer configuration
//! - **[`testing`]**: Markup serialization for assertions and snapshots
//!
//! ## Example
//!
//! ```ignore
//! use gilt_vdom::{h, Attrs, Component, Dom, Map, Renderer, VNode};
//!
//! let counter = Component::new("Counter", |scope| {
//!     let n = scope.state.get("n").and_then(|v| v.as_int()).unwrap_or(0);
//!     let this = scope.this.clone();
//!     Ok(Some(h(
//!         "button",
//!         Attrs::new().on("click", move |_| this.set_state(Map::new().with("n", n + 1))),
//!         [n.to_string()],
//!     )))
//! })
//! .build();
//!
//! let mut dom = Dom::new();
//! let container = dom.container("app");
//! let renderer = Renderer::new(dom);
//! renderer.render(&h(&counter, Attrs::new(), None::<VNode>), container, None)?;
//! ```

// Foundation
pub mod config;
pub mod value;

// Output tree
pub mod dom;

// Description and components
pub mod component;
pub mod vnode;

// Reconciliation
pub mod reconcile;
pub mod scheduler;

// Test support
pub mod testing;

pub use component::{Component, ComponentError, ComponentHandle, Phase, StateUpdate};
pub use config::{Config, Debounce};
pub use dom::{Dom, Host, Mutation, NodeId};
pub use reconcile::{ReconcileError, Renderer};
pub use value::{Event, Map, Value};
pub use vnode::{h, text, Attrs, Props, VNode};
