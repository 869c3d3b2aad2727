//! Stage 3 — Propagate (region growing), §4.2.
//!
//! Spreads each concrete format assignment outward into connected subgraphs
//! of `Any` nodes, stopping at nodes that already have a different concrete
//! format, do not support the incoming format, or would require a
//! conflicting reorder elsewhere.

use std::collections::{HashSet, VecDeque};

use log::{debug, trace};

use crate::advisor::LayoutAdvisor;
use crate::format::Fmt;
use crate::format_map::FormatMap;
use crate::graph::GraphLike;
use crate::node::NodeId;
use crate::stages::{both_direction_neighbors, EdgeDir};

/// Outcome of classifying one candidate edge during extent growth (§4.2's
/// table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    /// Already compatible; do not recurse.
    Same,
    /// Edge absorbed by the consumer; stop at `node`, possibly deferring it
    /// as a root for a later, independent extent.
    Fuse,
    /// The extent is not admissible; the whole attempt for the seed fails.
    Invalid,
    /// `node` joins the extent; its neighbors are enqueued.
    Recurse,
}

/// Classify the edge from an in-extent node (whose format is being treated
/// as `target`) to `neighbor` (whose current assignment is `sel`), per the
/// table in §4.2.
///
/// `allow_fuse` disables the Fuse-exact/Fuse-fallback branches; it exists so
/// the fully-connected override's backward admissibility check (§6.1,
/// "without fusing") can reuse this exact function with fusing turned off,
/// rather than duplicating the recursion (§9).
#[allow(clippy::too_many_arguments)]
pub fn classify_edge(
    graph: &dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    neighbor: NodeId,
    sel: Fmt,
    target: Fmt,
    source: NodeId,
    sink: NodeId,
    fmt_source: Fmt,
    fmt_sink: Fmt,
    allow_fuse: bool,
) -> EdgeClass {
    if sel == target {
        return EdgeClass::Same;
    }
    if allow_fuse && advisor.can_fuse_reorder(graph, source, sink, fmt_source, fmt_sink) {
        return EdgeClass::Fuse;
    }
    if allow_fuse {
        let fallback_sel = graph.output_layout(neighbor).format;
        let (fallback_source, fallback_sink) = if source == neighbor {
            (fallback_sel, fmt_sink)
        } else {
            (fmt_source, fallback_sel)
        };
        if advisor.can_fuse_reorder(graph, source, sink, fallback_source, fallback_sink) {
            return EdgeClass::Fuse;
        }
    }
    if sel != Fmt::Any {
        return EdgeClass::Invalid; // Conflict-concrete
    }
    if !advisor.is_format_supported(graph, neighbor, target) {
        return EdgeClass::Invalid; // Unsupported
    }
    EdgeClass::Recurse
}

/// The single-edge "would a hypothetical propagation of `target` from `from`
/// to `to` be admissible without fusing" check used by the fully-connected
/// override (§6.1). `dir` is the direction `to` lies in relative to `from`.
pub fn edge_admits_without_fuse(
    graph: &dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    f: &FormatMap,
    from: NodeId,
    to: NodeId,
    dir: EdgeDir,
    target: Fmt,
) -> bool {
    let sel = f.get_or_any(to);
    let (source, sink) = dir.orient(from, to);
    let (fmt_source, fmt_sink) = if source == from {
        (target, sel)
    } else {
        (sel, target)
    };
    matches!(
        classify_edge(graph, advisor, to, sel, target, source, sink, fmt_source, fmt_sink, false),
        EdgeClass::Same | EdgeClass::Recurse
    )
}

/// Attempt to grow a propagation extent from `root` with format `target`.
/// Returns the (unions of) nodes to overwrite on success, or `None` if the
/// extent is inadmissible anywhere. Nodes reached through a fusible
/// boundary are pushed onto `deferred` rather than included in the extent.
fn try_grow_extent(
    graph: &dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    f: &FormatMap,
    root: NodeId,
    target: Fmt,
    deferred: &mut VecDeque<NodeId>,
) -> Option<HashSet<NodeId>> {
    let mut extent = HashSet::new();
    let mut visited = HashSet::new();
    visited.insert(root);
    let mut queue = VecDeque::new();
    queue.push_back(root);

    while let Some(prev) = queue.pop_front() {
        for (neighbor, dir) in both_direction_neighbors(graph, prev) {
            if visited.contains(&neighbor) {
                continue;
            }
            let sel = f.get_or_any(neighbor);
            let (source, sink) = dir.orient(prev, neighbor);
            let (fmt_source, fmt_sink) = if source == prev {
                (target, sel)
            } else {
                (sel, target)
            };
            match classify_edge(
                graph, advisor, neighbor, sel, target, source, sink, fmt_source, fmt_sink, true,
            ) {
                EdgeClass::Same => {
                    visited.insert(neighbor);
                }
                EdgeClass::Fuse => {
                    visited.insert(neighbor);
                    if advisor.is_format_supported(graph, neighbor, target) {
                        deferred.push_back(neighbor);
                    }
                }
                EdgeClass::Invalid => return None,
                EdgeClass::Recurse => {
                    visited.insert(neighbor);
                    extent.insert(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }
    }
    Some(extent)
}

/// Run the deferred-root retry loop: each candidate tries to grow its own
/// extent; on failure it gets re-enqueued exactly once (tracked by a single
/// "rejected checkpoint" node id) before being abandoned for good. This is
/// the scheme described in §9 "Re-entry / retry termination".
fn drain_deferred_roots(
    graph: &dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    f: &mut FormatMap,
    target: Fmt,
    mut queue: VecDeque<NodeId>,
) {
    let mut checkpoint: Option<NodeId> = None;
    while let Some(candidate) = queue.pop_front() {
        if f.get_or_any(candidate) == target {
            continue; // already settled by an earlier candidate's extent
        }
        if checkpoint == Some(candidate) {
            // One full sweep since this candidate's first rejection has
            // completed; stop retrying entirely.
            break;
        }
        let mut sub_deferred = VecDeque::new();
        match try_grow_extent(graph, advisor, f, candidate, target, &mut sub_deferred) {
            Some(extent) => {
                // `candidate` itself is never overwritten here: it was
                // reached via a Fuse edge, not a Recurse one, so it already
                // has a format of its own (possibly a hard advisor
                // preference, possibly an override's decision) that this
                // retry must not clobber (§8 invariant 3). Only the
                // genuinely-`Any` nodes beyond it, discovered by this
                // extent growth, get `target`.
                for e in &extent {
                    f.set(*e, target);
                }
                queue.extend(sub_deferred);
            }
            None => {
                if checkpoint.is_none() {
                    checkpoint = Some(candidate);
                }
                queue.push_back(candidate);
            }
        }
    }
}

fn propagate_one(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &mut FormatMap, root: NodeId) {
    let target = f.get_or_any(root);
    if target.is_any() {
        return;
    }
    let mut deferred = VecDeque::new();
    match try_grow_extent(graph, advisor, f, root, target, &mut deferred) {
        Some(extent) => {
            trace!("propagate: seed {root} grew extent of {} node(s)", extent.len());
            for e in &extent {
                f.set(*e, target);
            }
            drain_deferred_roots(graph, advisor, f, target, deferred);
        }
        None => {
            trace!("propagate: seed {root} extent rejected");
        }
    }
}

/// Spread concrete formats from every constrained node into adjacent `Any`
/// regions, iterating seeds in processing order (§5's ordering guarantee).
pub fn propagate(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &mut FormatMap) {
    let order = graph.processing_order();
    debug!("propagate: {} node(s) in processing order", order.len());
    for n in order {
        if !graph.is_in_data_flow(n) {
            continue;
        }
        propagate_one(graph, advisor, f, n);
    }
}
