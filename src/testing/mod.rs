//! Testing helpers: output-tree serialization for assertions and snapshots.
//!
//! Use [`to_markup`] for compact one-line comparisons, [`to_pretty_markup`]
//! for multi-line snapshots, and [`describe_mutations`] to make a host
//! mutation log readable.

pub mod snapshot;

pub use snapshot::{describe_mutations, to_markup, to_pretty_markup};
