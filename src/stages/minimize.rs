//! Stage 4 — Minimize local reorders (§4.3).
//!
//! Runs only on nodes whose *advisor preference* was `Any` (captured before
//! Propagate ran any overwrites) — a concrete preference that would benefit
//! from swapping is never reconsidered. This is intentional: see §9 Open
//! Question (b), preserved as-is in `DESIGN.md`.

use log::{debug, trace};

use crate::advisor::LayoutAdvisor;
use crate::format::Fmt;
use crate::format_map::FormatMap;
use crate::graph::GraphLike;
use crate::node::NodeId;
use crate::stages::{both_direction_neighbors, EdgeDir};

/// The lexicographic `(count, volume)` metric of §4.3: the number of
/// neighbors whose format differs from `candidate` and cannot be fused,
/// and the summed element count of the source side of each such edge.
fn local_metric(
    graph: &dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    f: &FormatMap,
    n: NodeId,
    candidate: Fmt,
) -> (usize, usize) {
    let mut count = 0usize;
    let mut volume = 0usize;
    for (neighbor, dir) in both_direction_neighbors(graph, n) {
        let neighbor_fmt = f.get_or_any(neighbor);
        if neighbor_fmt.is_any() || neighbor_fmt == candidate {
            continue;
        }
        let (source, sink) = dir.orient(n, neighbor);
        let (fmt_source, fmt_sink) = if source == n {
            (candidate, neighbor_fmt)
        } else {
            (neighbor_fmt, candidate)
        };
        if advisor.can_fuse_reorder(graph, source, sink, fmt_source, fmt_sink) {
            continue;
        }
        count += 1;
        volume += graph.output_layout(source).element_count();
    }
    (count, volume)
}

fn candidate_formats(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &FormatMap, n: NodeId) -> Vec<Fmt> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for (neighbor, _) in both_direction_neighbors(graph, n) {
        let nf = f.get_or_any(neighbor);
        if nf.is_any() {
            continue;
        }
        if advisor.is_format_supported(graph, n, nf) && seen.insert(nf) {
            out.push(nf);
        }
    }
    out
}

fn minimize_node(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &mut FormatMap, n: NodeId) {
    if f.is_any(n) {
        let own_fmt = graph.output_layout(n).format;
        if advisor.is_format_supported(graph, n, own_fmt) {
            f.set(n, own_fmt);
        }
    }
    let current = f.get_or_any(n);
    if current.is_any() {
        trace!("minimize: {n} has no supported fallback format, leaving Any");
        return;
    }

    let baseline = local_metric(graph, advisor, f, n, current);
    if baseline.0 == 0 {
        return;
    }

    let mut best = (current, baseline);
    for candidate in candidate_formats(graph, advisor, f, n) {
        if candidate == current {
            continue;
        }
        let metric = local_metric(graph, advisor, f, n, candidate);
        if metric < best.1 {
            best = (candidate, metric);
        }
    }
    trace!("minimize: {n} picked {} with metric {:?}", best.0, best.1);
    f.set(n, best.0);
}

/// For every data-flow node whose advisor preference was `Any`, pick the
/// neighborhood format that minimizes the local `(count, volume)` metric.
pub fn minimize(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, preferences: &FormatMap, f: &mut FormatMap) {
    let order = graph.processing_order();
    debug!("minimize: scanning {} node(s)", order.len());
    for n in order {
        if !graph.is_in_data_flow(n) {
            continue;
        }
        if preferences.get_or_any(n).is_any() {
            minimize_node(graph, advisor, f, n);
        }
    }
}
