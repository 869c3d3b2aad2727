//! Stage 5 — Materialize reorders (§4.4).

use log::{debug, trace};

use crate::advisor::LayoutAdvisor;
use crate::format_map::FormatMap;
use crate::graph::GraphLike;
use crate::node::NodeKind;
use crate::reorder::ReorderFactory;
use crate::stages::EdgeDir;

/// Walk the graph once forward and once backward per node; for every
/// neighbor with a differing, non-fusible, non-image format, request a
/// reorder from the factory and splice it onto the edge. Afterwards,
/// recompute every node's output layout in processing order.
pub fn materialize(
    graph: &mut dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    factory: &mut dyn ReorderFactory,
    f: &FormatMap,
) {
    let order = graph.processing_order();
    debug!("materialize: scanning {} node(s)", order.len());

    for n in &order {
        let n = *n;
        if !graph.is_in_data_flow(n) {
            continue;
        }
        // A `Reorder` node already resolves the one format conversion it was
        // built for; re-running this stage against one (as happens on a
        // second pass over a graph the pass itself already materialized)
        // must not reconsider it as a source of further conversions.
        if matches!(graph.kind(n), NodeKind::Reorder) {
            continue;
        }
        let n_fmt = f.get_or_any(n);
        if n_fmt.is_any() || n_fmt.is_image() {
            continue;
        }

        for dir in EdgeDir::both() {
            // Snapshot neighbors before mutating this edge's surroundings,
            // since `add_intermediate` rewires the very lists we'd
            // otherwise be iterating.
            let neighbors = dir.neighbors(graph, n);
            for m in neighbors {
                if !graph.is_in_data_flow(m) {
                    continue;
                }
                // Likewise: a neighbor that is itself a `Reorder` node has
                // already bridged whatever format gap existed here. Its own
                // `F` entry (if concrete) reflects only its output side, so
                // comparing it against `n_fmt` would otherwise look like an
                // unresolved mismatch and splice a redundant reorder right
                // next to the existing one, breaking idempotency (§8
                // invariant 4).
                if matches!(graph.kind(m), NodeKind::Reorder) {
                    continue;
                }
                let m_fmt = f.get_or_any(m);
                if m_fmt.is_any() || m_fmt == n_fmt {
                    continue;
                }

                let (source, sink) = dir.orient(n, m);
                let (source_fmt, sink_fmt) = if source == n { (n_fmt, m_fmt) } else { (m_fmt, n_fmt) };

                if source_fmt.is_image() || sink_fmt.is_image() {
                    continue;
                }
                if advisor.can_fuse_reorder(graph, source, sink, source_fmt, sink_fmt) {
                    continue;
                }

                // `graph.output_layout(source)` is the node's raw,
                // pre-pass physical layout (shape/element type are still
                // trustworthy, but its `format` field was never synced to
                // `F` as the earlier stages ran). `in_layout` must carry
                // the format this pass actually decided for `source`
                // (`source_fmt`, already known here), not that stale
                // value, or a source node whose original declared format
                // happens to coincide with the sink's chosen format would
                // wrongly look like "no conversion needed".
                let source_layout = graph.output_layout(source);
                let in_layout = source_layout.with_format(source_fmt);
                let out_layout = source_layout.with_format(sink_fmt);

                let (op, existing) = factory.get_reorder(source, &in_layout, &out_layout);
                if let Some(op) = op {
                    trace!("materialize: reorder {source} -> {sink} ({source_fmt} -> {sink_fmt})");
                    graph.add_intermediate(op, sink, source, existing);
                }
            }
        }
    }

    // Recompute each node's output layout from its (possibly just-rewired)
    // inputs, then pin its physical *format* to whatever this pass actually
    // decided (`F[n]`). The recompute alone copies a format down from a
    // node's first dependency, which never reaches a dependency-free source
    // node and is only as correct as the upstream node's own physical layout
    // already being in sync — without the explicit pin below, a node whose
    // decided format this pass never wrote back would still show its
    // original pre-pass format to the next run, which would then re-decide
    // already-settled `Any` nodes off that stale information (§8 invariant
    // 4: idempotent on its own output).
    for n in graph.processing_order() {
        graph.recalc_output_layout(n, false);
        if graph.is_in_data_flow(n) {
            if let Some(fmt) = f.get(n) {
                if !fmt.is_any() {
                    graph.set_output_format(n, fmt);
                }
            }
        }
    }
}
