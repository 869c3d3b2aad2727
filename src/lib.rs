//! Layout-reorder insertion pass: assigns a concrete tensor memory format to
//! every data-flow node in a computation graph, minimizes the number of
//! format conversions required between neighbors, and materializes whatever
//! conversions remain as explicit reorder nodes.
//!
//! This crate implements only the pass itself (`pass::LayoutReorderPass`)
//! plus the small collaborator contracts it runs against (`advisor`,
//! `reorder`, `graph::GraphLike`). The real compiler graph, the layout
//! advisor's preference/support/fusing heuristics, and the reorder factory
//! are all external collaborators the pass trusts; this crate also ships a
//! minimal concrete graph (`graph::SimpleGraph`) and a default reorder
//! factory so it is runnable end to end, both for the demo binary and for
//! the integration tests.

pub mod advisor;
pub mod error;
pub mod format;
pub mod format_map;
pub mod graph;
pub mod node;
pub mod pass;
pub mod reorder;
pub mod stages;
pub mod stats;

pub use format::{ElementType, Fmt, Layout};
pub use format_map::FormatMap;
pub use node::NodeId;
pub use pass::LayoutReorderPass;
pub use stats::Stats;
