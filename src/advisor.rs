//! The layout advisor contract (§6 "Advisor contract").
//!
//! The advisor is an external oracle; this pass trusts its answers for
//! correctness (§1 Non-goals: "validating computational correctness of
//! layouts ... the advisor is trusted").

use crate::format::Fmt;
use crate::graph::GraphLike;
use crate::node::{NodeId, OptimizationAttributes};

pub trait LayoutAdvisor {
    /// The preferred format for `n`, or [`Fmt::Any`] if unconstrained.
    fn preferred_format(&self, graph: &dyn GraphLike, n: NodeId) -> Fmt;

    /// Whether `n`'s implementation supports running in format `f`.
    fn is_format_supported(&self, graph: &dyn GraphLike, n: NodeId, f: Fmt) -> bool;

    /// Whether a reorder converting `producer_fmt -> consumer_fmt` on the
    /// edge `producer -> consumer` can be absorbed into `consumer`'s
    /// implementation at no extra cost.
    fn can_fuse_reorder(
        &self,
        graph: &dyn GraphLike,
        producer: NodeId,
        consumer: NodeId,
        producer_fmt: Fmt,
        consumer_fmt: Fmt,
    ) -> bool;

    /// Flag bag read by the override rules in §6.
    fn optimization_attributes(&self) -> OptimizationAttributes;
}
