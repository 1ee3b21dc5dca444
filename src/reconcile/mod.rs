//! Reconciliation: the renderer entry point, the diff engine, and error
//! boundary propagation.
//!
//! A [`Renderer`] owns one host and the component instances rendered into
//! it. [`Renderer::render`] mounts a description tree into a container, or
//! diffs it against a root previously rendered there.

pub(crate) mod attributes;
pub(crate) mod boundary;
mod children;
pub(crate) mod engine;
pub(crate) mod mounted;

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::component::instance::{InstanceId, Registry, Rerender};
use crate::component::{ComponentError, LifecycleEvent};
use crate::config::Config;
use crate::dom::{Dom, Host, NodeId};
use crate::scheduler;
use crate::value::Event;
use crate::vnode::{debug, VNode};

use engine::Engine;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that escape a render pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// A `ref` attribute holds something other than a ref callback.
    #[error("`ref` on <{tag}> must be a callback, found {found}")]
    MalformedRef { tag: String, found: &'static str },

    /// A render or lifecycle failure that no boundary handled.
    #[error("uncaught error in <{component}>: {source}")]
    Uncaught {
        component: String,
        #[source]
        source: ComponentError,
    },

    /// A drain kept re-queuing updates past the configured bound.
    #[error("render drain exceeded {limit} passes; a component keeps updating itself")]
    RunawayUpdates { limit: usize },

    /// `render(.., existing)` named a node that is not a root of the container.
    #[error("no root rendered into {container:?} at the given node")]
    UnknownRoot { container: NodeId },

    /// A mount call arrived while the renderer was mid-pass.
    #[error("renderer is already running a pass")]
    EngineBusy,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

impl<H: Host> Rerender for RefCell<Engine<H>> {
    fn rerender(&self, id: InstanceId, force: bool) -> Result<(), ReconcileError> {
        let mut engine = self.try_borrow_mut().map_err(|_| ReconcileError::EngineBusy)?;
        engine.rerender(id, force)
    }

    fn is_busy(&self) -> bool {
        self.try_borrow_mut().is_err()
    }
}

/// Keeps a host tree in sync with description trees.
///
/// ```ignore
/// let mut dom = Dom::new();
/// let container = dom.container("app");
/// let renderer = Renderer::new(dom);
/// let root = renderer.render(&h("p", Attrs::new(), ["hello"]), container, None)?;
/// renderer.render(&h("p", Attrs::new(), ["world"]), container, Some(root))?;
/// ```
pub struct Renderer<H: Host + 'static> {
    engine: Rc<RefCell<Engine<H>>>,
    registry: Rc<Registry>,
}

impl<H: Host + 'static> Renderer<H> {
    /// Create a renderer with the default [`Config`].
    pub fn new(host: H) -> Self {
        Self::with_config(host, Config::default())
    }

    /// Create a renderer. The queue settings of `config` apply to the
    /// thread's render queue.
    pub fn with_config(host: H, config: Config) -> Self {
        scheduler::configure(&config);
        if config.diagnostics {
            debug::install_diagnostics();
        }

        let registry = Rc::new(Registry::new());
        let engine = Rc::new(RefCell::new(Engine::new(
            host,
            registry.clone(),
            config.max_drain_passes,
        )));
        let rerender: Rc<dyn Rerender> = engine.clone();
        registry.attach(Rc::downgrade(&rerender));

        Self { engine, registry }
    }

    fn engine(&self) -> Result<RefMut<'_, Engine<H>>, ReconcileError> {
        self.engine
            .try_borrow_mut()
            .map_err(|_| ReconcileError::EngineBusy)
    }

    /// Render `vnode` into `container`.
    ///
    /// With `existing == None` the tree is mounted fresh and appended to the
    /// container. Otherwise it is diffed against the root previously rendered
    /// at `existing`. Returns the root's output node.
    pub fn render(
        &self,
        vnode: &VNode,
        container: NodeId,
        existing: Option<NodeId>,
    ) -> Result<NodeId, ReconcileError> {
        let node = self.engine()?.render_root(vnode, container, existing)?;
        scheduler::resume()?;
        Ok(node)
    }

    /// Tear down everything rendered into `container`.
    pub fn unmount(&self, container: NodeId) -> Result<(), ReconcileError> {
        self.engine()?.unmount_container(container)?;
        scheduler::resume()
    }

    /// Drain the thread's render queue now.
    pub fn flush(&self) -> Result<(), ReconcileError> {
        scheduler::flush()
    }

    /// Output nodes of the roots rendered into `container`.
    pub fn roots(&self, container: NodeId) -> Vec<NodeId> {
        self.engine.borrow().roots(container)
    }

    /// Borrow the host.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a lifecycle hook of this renderer.
    pub fn host(&self) -> Ref<'_, H> {
        Ref::map(self.engine.borrow(), |engine| &engine.host)
    }

    /// Borrow the host mutably.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a lifecycle hook of this renderer.
    pub fn host_mut(&self) -> RefMut<'_, H> {
        RefMut::map(self.engine.borrow_mut(), |engine| &mut engine.host)
    }

    /// Drain the lifecycle events recorded since the last call.
    pub fn take_lifecycle_events(&self) -> Vec<LifecycleEvent> {
        self.engine.borrow_mut().take_lifecycle_events()
    }

    /// Number of live component instances.
    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }
}

impl Renderer<Dom> {
    /// Deliver `event` to the listener on its target node.
    ///
    /// Returns `false` if nothing listens. The listener runs with the host
    /// released, so it may call `set_state` or `force_update`.
    pub fn dispatch(&self, event: &Event) -> Result<bool, ReconcileError> {
        let listener = self.host().listener(event.target, &event.name);
        let Some(listener) = listener else {
            return Ok(false);
        };
        listener.call(event);
        scheduler::resume()?;
        Ok(true)
    }
}
