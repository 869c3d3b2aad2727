//! Stage "5b" — diagnostic statistics (§4.5). Orthogonal to correctness.
//!
//! §9 Open Question (a) flags that halving a reorder count under the
//! assumption every edge is seen from both endpoints breaks down at graph
//! boundaries; `DESIGN.md` records how this crate resolves that ambiguity.

use crate::advisor::LayoutAdvisor;
use crate::format_map::FormatMap;
use crate::graph::GraphLike;
use crate::node::NodeId;
use crate::stages::both_direction_neighbors;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Count of fusible-boundary edges, halved since each is visited from
    /// both endpoints.
    pub fusible_reorders: usize,
    /// Nodes with at least one fusible incoming reorder.
    pub nodes_with_fusible_incoming: usize,
    /// Nodes whose `NodeKind` is `Reorder` — i.e. actually materialized.
    pub materialized_reorders: usize,
}

/// Count fusible boundary edges against `F`, *before* `materialize` mutates
/// the graph, so the result describes what `materialize` is about to skip
/// via fusing. `materialized_reorders` is left at zero here — no reorder
/// nodes exist yet at this point in the pipeline — and must be filled in
/// separately by [`count_materialized_reorders`] once `materialize` (and
/// the post-materialization overrides) have run.
pub fn compute_statistics(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &FormatMap) -> Stats {
    let mut fusible_edges = 0usize;
    let mut with_incoming: HashSet<NodeId> = HashSet::new();

    for n in graph.processing_order() {
        if !graph.is_in_data_flow(n) {
            continue;
        }
        let n_fmt = f.get_or_any(n);
        if n_fmt.is_any() {
            continue;
        }
        for (neighbor, dir) in both_direction_neighbors(graph, n) {
            let neighbor_fmt = f.get_or_any(neighbor);
            if neighbor_fmt.is_any() || neighbor_fmt == n_fmt {
                continue;
            }
            let (source, sink) = dir.orient(n, neighbor);
            let (source_fmt, sink_fmt) = if source == n { (n_fmt, neighbor_fmt) } else { (neighbor_fmt, n_fmt) };
            if advisor.can_fuse_reorder(graph, source, sink, source_fmt, sink_fmt) {
                fusible_edges += 1;
                with_incoming.insert(sink);
            }
        }
    }

    Stats {
        // Every such edge is discovered once from each endpoint.
        fusible_reorders: fusible_edges / 2,
        nodes_with_fusible_incoming: with_incoming.len(),
        materialized_reorders: 0,
    }
}

/// Count nodes whose `NodeKind` is `Reorder`. Call this *after* `materialize`
/// and the post-materialization overrides (§6.3) have both run, so it
/// reflects every reorder actually spliced into the graph, not just the
/// ones `materialize` itself inserted.
pub fn count_materialized_reorders(graph: &dyn GraphLike) -> usize {
    graph
        .processing_order()
        .into_iter()
        .filter(|&n| matches!(graph.kind(n), crate::node::NodeKind::Reorder))
        .count()
}
