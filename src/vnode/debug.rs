//! Development diagnostics: a chained per-node hook.
//!
//! Every node built by [`h`](super::factory::h) is handed to the installed
//! hook immediately after construction. Hooks observe only; they cannot alter
//! the node or stop the pipeline. Installing a hook chains it in front of the
//! previously installed one instead of replacing it.
//!
//! [`install_diagnostics`] installs the built-in checker, which reports
//! duplicate child keys, malformed refs, and unresolved component references
//! through `tracing`.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::node::{Key, NodeRef, VNode};

type NodeHook = Rc<dyn Fn(&VNode)>;

thread_local! {
    static NODE_HOOK: RefCell<Option<NodeHook>> = const { RefCell::new(None) };
    static DIAGNOSTICS_INSTALLED: Cell<bool> = const { Cell::new(false) };
}

/// Install a hook that runs for every constructed node.
///
/// The new hook runs first, then whichever hook was installed before it.
pub fn install_hook(hook: impl Fn(&VNode) + 'static) {
    NODE_HOOK.with(|slot| {
        let previous = slot.borrow_mut().take();
        let chained: NodeHook = Rc::new(move |node: &VNode| {
            hook(node);
            if let Some(previous) = &previous {
                previous(node);
            }
        });
        *slot.borrow_mut() = Some(chained);
    });
}

/// Remove every installed hook.
pub fn reset_hooks() {
    NODE_HOOK.with(|slot| {
        slot.borrow_mut().take();
    });
    DIAGNOSTICS_INSTALLED.with(|flag| flag.set(false));
}

/// Run the hook chain for `node`.
pub(crate) fn notify(node: &VNode) {
    // Clone out of the slot so a hook may itself construct nodes.
    let hook = NODE_HOOK.with(|slot| slot.borrow().clone());
    if let Some(hook) = hook {
        hook(node);
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A structural problem found in a description node.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Two or more children share a key.
    DuplicateKey { key: Key, node: String },
    /// `ref` holds something other than a ref callback.
    MalformedRef { found: &'static str, node: String },
    /// A component reference without a definition.
    UnresolvedComponent { node: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateKey { key, node } => write!(
                f,
                "children share the key {key:?}; this may cause glitches while reconciling: {node}"
            ),
            Diagnostic::MalformedRef { found, node } => write!(
                f,
                "the \"ref\" attribute should be a callback, but a {found} was passed: {node}"
            ),
            Diagnostic::UnresolvedComponent { node } => {
                write!(f, "undefined component passed to h(): {node}")
            }
        }
    }
}

/// Inspect a single node (not its descendants) for structural mistakes.
pub fn diagnose(node: &VNode) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    if node.is_unresolved() {
        found.push(Diagnostic::UnresolvedComponent {
            node: node.summary(),
        });
    }

    if let Some(NodeRef::Malformed(kind)) = node.node_ref() {
        found.push(Diagnostic::MalformedRef {
            found: kind,
            node: node.summary(),
        });
    }

    let mut seen = HashSet::new();
    for key in node.children().iter().filter_map(VNode::key) {
        if !seen.insert(key) {
            // One report per node is enough.
            found.push(Diagnostic::DuplicateKey {
                key: key.clone(),
                node: node.summary(),
            });
            break;
        }
    }

    found
}

/// Install the built-in diagnostics hook. Installing it again before
/// [`reset_hooks`] is a no-op.
pub fn install_diagnostics() {
    if DIAGNOSTICS_INSTALLED.with(|flag| flag.replace(true)) {
        return;
    }
    install_hook(|node| {
        for diagnostic in diagnose(node) {
            tracing::error!(kind = ?node.kind(), "{diagnostic}");
        }
    });
}
