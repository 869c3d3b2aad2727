//! Shared test doubles for the black-box integration suite in
//! `tests/scenarios.rs`. The teacher's own `tests/integration_tests.rs`
//! (driving a real `ezkl` binary end to end) is the precedent for a
//! top-level integration suite separate from the unit tests inlined in
//! `src/`; here the "binary under test" is the pass itself, run in-process
//! against `SimpleGraph` and these doubles.

use std::collections::{HashMap, HashSet};

use layout_reorder::advisor::LayoutAdvisor;
use layout_reorder::graph::GraphLike;
use layout_reorder::node::{NodeId, NodeKind, OptimizationAttributes};
use layout_reorder::Fmt;

/// A table-driven [`LayoutAdvisor`] double: every answer is looked up from
/// a fixed map built by the scenario, with permissive defaults (everything
/// supported, nothing fusible) unless overridden.
///
/// Reorder nodes this pass itself inserted are pinned to their own output
/// format, mirroring how a real advisor would answer for a node whose
/// entire purpose is to already be in that format — without this, a second
/// run could repropagate into a materialized reorder and violate the
/// idempotency invariant (§8 invariant 4).
#[derive(Default)]
pub struct TestAdvisor {
    pub preferred: HashMap<NodeId, Fmt>,
    pub unsupported: HashSet<(NodeId, Fmt)>,
    pub fusible_edges: HashSet<(NodeId, NodeId, Fmt, Fmt)>,
    pub b_fs_yx_fsv16_network: bool,
}

impl TestAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefer(mut self, n: NodeId, f: Fmt) -> Self {
        self.preferred.insert(n, f);
        self
    }

    pub fn unsupport(mut self, n: NodeId, f: Fmt) -> Self {
        self.unsupported.insert((n, f));
        self
    }

    pub fn fuse(mut self, producer: NodeId, consumer: NodeId, from: Fmt, to: Fmt) -> Self {
        self.fusible_edges.insert((producer, consumer, from, to));
        self
    }

    pub fn network_flag(mut self, value: bool) -> Self {
        self.b_fs_yx_fsv16_network = value;
        self
    }
}

impl LayoutAdvisor for TestAdvisor {
    fn preferred_format(&self, graph: &dyn GraphLike, n: NodeId) -> Fmt {
        if graph.kind(n) == NodeKind::Reorder {
            return graph.output_layout(n).format;
        }
        self.preferred.get(&n).copied().unwrap_or(Fmt::Any)
    }

    fn is_format_supported(&self, _graph: &dyn GraphLike, n: NodeId, f: Fmt) -> bool {
        !self.unsupported.contains(&(n, f))
    }

    fn can_fuse_reorder(
        &self,
        _graph: &dyn GraphLike,
        producer: NodeId,
        consumer: NodeId,
        producer_fmt: Fmt,
        consumer_fmt: Fmt,
    ) -> bool {
        self.fusible_edges
            .contains(&(producer, consumer, producer_fmt, consumer_fmt))
    }

    fn optimization_attributes(&self) -> OptimizationAttributes {
        OptimizationAttributes {
            b_fs_yx_fsv16_network: self.b_fs_yx_fsv16_network,
        }
    }
}
