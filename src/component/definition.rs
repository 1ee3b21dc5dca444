//! Component definitions: a render function plus an optional hook record.
//!
//! A [`Component`] is composition, not inheritance: the engine checks each
//! hook for presence and calls it directly. A definition with no hooks and no
//! state is a valid stateless component.

use std::fmt;
use std::rc::Rc;

use super::handle::ComponentHandle;
use crate::value::Map;
use crate::vnode::{Props, VNode};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error raised by a render function or lifecycle hook.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
    component: Option<String>,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the component the error was raised in, once known.
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Attribute the error to a component, unless already attributed.
    pub(crate) fn raised_in(mut self, component: &str) -> Self {
        if self.component.is_none() {
            self.component = Some(component.to_owned());
        }
        self
    }
}

impl From<&str> for ComponentError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ComponentError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Result of a render function. `Ok(None)` renders nothing.
pub type RenderResult = Result<Option<VNode>, ComponentError>;

/// Result of a lifecycle hook.
pub type HookResult = Result<(), ComponentError>;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Inputs to a render function.
pub struct Scope<'a> {
    pub props: &'a Props,
    pub state: &'a Map,
    pub context: &'a Map,
    /// Handle for wiring `set_state` into listeners created during render.
    pub this: &'a ComponentHandle,
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

type RenderFn = dyn Fn(&Scope<'_>) -> RenderResult;
type InitialStateFn = dyn Fn(&Props, &Map) -> Map;
type HandleHook = dyn Fn(&ComponentHandle) -> HookResult;
type PropsHook = dyn Fn(&ComponentHandle, &Props, &Map) -> HookResult;
type DecisionHook = dyn Fn(&ComponentHandle, &Props, &Map, &Map) -> Result<bool, ComponentError>;
type TransitionHook = dyn Fn(&ComponentHandle, &Props, &Map, &Map) -> HookResult;
type CatchHook = dyn Fn(&ComponentHandle, &ComponentError) -> HookResult;
type ContextFn = dyn Fn(&Scope<'_>) -> Map;

/// Optional lifecycle hooks. Absent hooks are skipped.
#[derive(Default)]
pub struct Hooks {
    /// Initial state from `(props, context)`.
    pub initial_state: Option<Box<InitialStateFn>>,
    /// Before the first render. `set_state` here merges without a new pass.
    pub will_mount: Option<Box<HandleHook>>,
    /// After the first render, once the output node is attached.
    pub did_mount: Option<Box<HandleHook>>,
    /// A parent re-render delivered `(next_props, next_context)`.
    pub will_receive_props: Option<Box<PropsHook>>,
    /// `(next_props, next_state, next_context)`; `false` skips the render.
    pub should_update: Option<Box<DecisionHook>>,
    /// `(next_props, next_state, next_context)` right before the render.
    pub will_update: Option<Box<TransitionHook>>,
    /// `(prev_props, prev_state, prev_context)` after the output is mutated.
    pub did_update: Option<Box<TransitionHook>>,
    /// Before teardown, while the output node is still attached.
    pub will_unmount: Option<Box<HandleHook>>,
    /// A descendant (or this instance) failed.
    pub did_catch: Option<Box<CatchHook>>,
    /// Context entries added for descendants.
    pub child_context: Option<Box<ContextFn>>,
}

impl Hooks {
    /// Whether no hook at all is defined.
    pub fn is_empty(&self) -> bool {
        self.initial_state.is_none()
            && self.will_mount.is_none()
            && self.did_mount.is_none()
            && self.will_receive_props.is_none()
            && self.should_update.is_none()
            && self.will_update.is_none()
            && self.did_update.is_none()
            && self.will_unmount.is_none()
            && self.did_catch.is_none()
            && self.child_context.is_none()
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A component definition. Identity (`Rc` pointer) decides whether a position
/// keeps its instance across renders.
pub struct Component {
    name: String,
    render: Box<RenderFn>,
    hooks: Hooks,
}

impl Component {
    /// Start a definition with a render function.
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Scope<'_>) -> RenderResult + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            render: Box::new(render),
            hooks: Hooks::default(),
        }
    }

    /// A stateless component: a plain function of its props.
    pub fn stateless(
        name: impl Into<String>,
        render: impl Fn(&Props) -> RenderResult + 'static,
    ) -> Self {
        Self::new(name, move |scope| render(scope.props))
    }

    /// Finish the definition.
    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Whether this definition is stateless (no hooks).
    pub fn is_stateless(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn render(&self, scope: &Scope<'_>) -> RenderResult {
        (self.render)(scope)
    }

    // ── Hook builders ────────────────────────────────────────────────

    pub fn initial_state(mut self, f: impl Fn(&Props, &Map) -> Map + 'static) -> Self {
        self.hooks.initial_state = Some(Box::new(f));
        self
    }

    pub fn will_mount(mut self, f: impl Fn(&ComponentHandle) -> HookResult + 'static) -> Self {
        self.hooks.will_mount = Some(Box::new(f));
        self
    }

    pub fn did_mount(mut self, f: impl Fn(&ComponentHandle) -> HookResult + 'static) -> Self {
        self.hooks.did_mount = Some(Box::new(f));
        self
    }

    pub fn will_receive_props(
        mut self,
        f: impl Fn(&ComponentHandle, &Props, &Map) -> HookResult + 'static,
    ) -> Self {
        self.hooks.will_receive_props = Some(Box::new(f));
        self
    }

    pub fn should_update(
        mut self,
        f: impl Fn(&ComponentHandle, &Props, &Map, &Map) -> Result<bool, ComponentError> + 'static,
    ) -> Self {
        self.hooks.should_update = Some(Box::new(f));
        self
    }

    pub fn will_update(
        mut self,
        f: impl Fn(&ComponentHandle, &Props, &Map, &Map) -> HookResult + 'static,
    ) -> Self {
        self.hooks.will_update = Some(Box::new(f));
        self
    }

    pub fn did_update(
        mut self,
        f: impl Fn(&ComponentHandle, &Props, &Map, &Map) -> HookResult + 'static,
    ) -> Self {
        self.hooks.did_update = Some(Box::new(f));
        self
    }

    pub fn will_unmount(mut self, f: impl Fn(&ComponentHandle) -> HookResult + 'static) -> Self {
        self.hooks.will_unmount = Some(Box::new(f));
        self
    }

    pub fn did_catch(
        mut self,
        f: impl Fn(&ComponentHandle, &ComponentError) -> HookResult + 'static,
    ) -> Self {
        self.hooks.did_catch = Some(Box::new(f));
        self
    }

    pub fn child_context(mut self, f: impl Fn(&Scope<'_>) -> Map + 'static) -> Self {
        self.hooks.child_context = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("stateless", &self.is_stateless())
            .finish()
    }
}
