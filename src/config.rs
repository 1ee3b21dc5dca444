//! Renderer configuration: drain scheduling and safety bounds.

use std::fmt;
use std::rc::Rc;

/// Default bound on render passes in one drain cycle.
pub const DEFAULT_MAX_DRAIN_PASSES: usize = 1000;

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

/// How a drain of the render queue is scheduled after the first enqueue.
#[derive(Clone, Default)]
pub enum Debounce {
    /// Nothing is scheduled; the host calls [`crate::scheduler::flush`] at its
    /// own scheduling boundary.
    #[default]
    Manual,
    /// Spawn a local tokio task that yields once and then drains.
    ///
    /// Inside a runtime this must run within a `tokio::task::LocalSet`. With
    /// no runtime on the thread it behaves like `Manual`.
    Tokio,
    /// Hand the drain thunk to a user-supplied deferral function.
    Custom(Rc<dyn Fn(Box<dyn FnOnce()>)>),
}

impl Debounce {
    /// Build a custom deferral strategy.
    pub fn custom(f: impl Fn(Box<dyn FnOnce()>) + 'static) -> Self {
        Debounce::Custom(Rc::new(f))
    }
}

impl fmt::Debug for Debounce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Debounce::Manual => f.write_str("Manual"),
            Debounce::Tokio => f.write_str("Tokio"),
            Debounce::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for a [`Renderer`](crate::reconcile::Renderer).
///
/// The render queue is shared by every renderer on the thread, so the queue
/// settings of the most recently created renderer apply.
#[derive(Debug, Clone)]
pub struct Config {
    /// Drain scheduling strategy.
    pub debounce: Debounce,
    /// Maximum render passes per drain cycle before the cycle is aborted as a
    /// runaway self-update.
    pub max_drain_passes: usize,
    /// Install the built-in description-node diagnostics hook.
    pub diagnostics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: Debounce::Manual,
            max_drain_passes: DEFAULT_MAX_DRAIN_PASSES,
            diagnostics: false,
        }
    }
}

impl Config {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debounce strategy (builder).
    pub fn with_debounce(mut self, debounce: Debounce) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the drain pass bound (builder). Clamped to at least 1.
    pub fn with_max_drain_passes(mut self, passes: usize) -> Self {
        self.max_drain_passes = passes.max(1);
        self
    }

    /// Enable or disable the diagnostics hook (builder).
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }
}
