//! Render scheduling: the process-wide render queue.
//!
//! - [`flush`] drains the queue now.
//! - [`batch`] runs a closure, then drains what it enqueued.
//! - [`configure`] applies a [`Config`](crate::config::Config)'s queue settings.
//! - [`reset`] restores the pristine queue (test isolation).

pub mod queue;

pub(crate) use queue::{enqueue, resume};
pub use queue::{batch, configure, flush, is_draining, pending, reset};
