//! Crate-local error type.
//!
//! The pass itself never returns `Err` (§7: every decision is "apply" or
//! "skip", nothing aborts compilation). This type exists only for the
//! fallible edges around the pass: building a [`crate::graph::SimpleGraph`]
//! from a node list, or looking up a stale [`crate::node::NodeId`].

use crate::node::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} is not present in the graph")]
    UnknownNode(NodeId),

    #[error("node {0} is referenced as a dependency/user of itself")]
    SelfLoop(NodeId),

    #[error("node {0} was constructed with an out-of-range id")]
    IdOutOfRange(NodeId),
}
