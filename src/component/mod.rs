//! Components: definitions, instances, lifecycle phases, and handles.

pub mod definition;
pub mod handle;
pub mod instance;
pub mod lifecycle;

pub use definition::{Component, ComponentError, HookResult, Hooks, RenderResult, Scope};
pub use handle::{ComponentHandle, StateUpdate};
pub use instance::InstanceId;
pub use lifecycle::{LifecycleEvent, LifecycleTracker, Phase};
