//! Stage 2 — Overrides, and the post-materialization input-reorder rules
//! (§6, rules 1-3). These are domain-specific pre/post-adjustments to `F`,
//! not part of the algorithmic core; §9 explicitly asks that they stay
//! table-driven and isolated so they can be retired independently.

use log::debug;

use crate::advisor::LayoutAdvisor;
use crate::format::{ElementType, Fmt, Layout};
use crate::format_map::FormatMap;
use crate::graph::GraphLike;
use crate::node::NodeKind;
use crate::reorder::ReorderFactory;
use crate::stages::propagate::edge_admits_without_fuse;
use crate::stages::EdgeDir;

/// §6 rule 1: fully-connected output demotion.
///
/// For every fully-connected node whose `F[n]` is not already `bfyx`: if one
/// of the known-fusable source formats can fuse a conversion into `bfyx` on
/// the edge `input -> n`, and a hypothetical backward propagation of that
/// format from `n` to `input` would be admissible without fusing, demote
/// `F[n]` to `bfyx`.
pub fn apply_fully_connected_demotion(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &mut FormatMap) {
    for n in graph.processing_order() {
        if !graph.is_in_data_flow(n) || graph.kind(n) != NodeKind::FullyConnected {
            continue;
        }
        if f.get_or_any(n) == Fmt::Bfyx {
            continue;
        }
        let Some(&input) = graph.dependencies(n).first() else {
            continue;
        };
        if !graph.is_in_data_flow(input) {
            continue;
        }

        for &candidate in Fmt::FC_DEMOTION_CANDIDATES {
            if advisor.can_fuse_reorder(graph, input, n, candidate, Fmt::Bfyx)
                && edge_admits_without_fuse(graph, advisor, f, n, input, EdgeDir::Backward, candidate)
            {
                debug!("override: demoting fully-connected {n} to bfyx (via {candidate})");
                f.set(n, Fmt::Bfyx);
                break;
            }
        }
    }
}

/// §6 rule 2: the int8 `mvn -> conv -> mvn` pattern-match workaround.
///
/// Treat the shape fixture (3x3 int8 weights, input feature 16, output
/// feature 3, spatial 1280x720) as a unit-test fixture, not general logic,
/// per §9.
pub fn apply_int8_mvn_conv_mvn_pattern(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor, f: &mut FormatMap) {
    if !advisor.optimization_attributes().b_fs_yx_fsv16_network {
        return;
    }

    for conv in graph.processing_order() {
        if !graph.is_in_data_flow(conv) {
            continue;
        }
        let conv_attrs = match graph.kind(conv) {
            NodeKind::Convolution(attrs) => attrs,
            _ => continue,
        };
        if f.get_or_any(conv) != Fmt::ByxfAf32 {
            continue;
        }

        let deps = graph.dependencies(conv);
        let [mvn_in] = deps.as_slice() else { continue };
        let mvn_in = *mvn_in;
        if !matches!(graph.kind(mvn_in), NodeKind::Mvn(_)) {
            continue;
        }
        if f.get_or_any(mvn_in) != Fmt::BFsYxFsv16 {
            continue;
        }
        if graph.output_layout(mvn_in).element_type != ElementType::I8 {
            continue;
        }

        let users = graph.users(conv);
        let [mvn_out] = users.as_slice() else { continue };
        let mvn_out = *mvn_out;
        let mvn_out_attrs = match graph.kind(mvn_out) {
            NodeKind::Mvn(attrs) => attrs,
            _ => continue,
        };
        if mvn_out_attrs.across_channels || f.get_or_any(mvn_out) != Fmt::Bfyx {
            continue;
        }

        if !conv_attrs.matches_int8_pattern_fixture() {
            continue;
        }

        debug!("override: int8 mvn->conv->mvn pattern matched at {conv}/{mvn_out}");
        f.set(conv, Fmt::BFsYxFsv16);
        f.set(mvn_out, Fmt::BFsYxFsv16);
    }
}

/// Force `input`'s layout to `desired`, inserting a reorder on the edge
/// `input -> sink` if the factory decides one is needed. Shared by all
/// three post-materialization rules in §6.3.
fn force_input_layout(
    graph: &mut dyn GraphLike,
    factory: &mut dyn ReorderFactory,
    sink: crate::node::NodeId,
    input: crate::node::NodeId,
    desired: &Layout,
) {
    let current = graph.output_layout(input);
    if &current == desired {
        return;
    }
    let (op, existing) = factory.get_reorder(input, &current, desired);
    if let Some(op) = op {
        graph.add_intermediate(op, sink, input, existing);
    }
}

/// §6 rule 3: post-materialization per-kind input reorders. Runs after
/// reorder insertion and layout recomputation.
pub fn apply_post_materialization_overrides(
    graph: &mut dyn GraphLike,
    advisor: &dyn LayoutAdvisor,
    factory: &mut dyn ReorderFactory,
) {
    for n in graph.processing_order() {
        if !graph.is_in_data_flow(n) {
            continue;
        }
        match graph.kind(n) {
            NodeKind::DetectionOutput => {
                for input in graph.dependencies(n) {
                    let current = graph.output_layout(input);
                    let desired = current.with_format(Fmt::Bfyx).with_element_type(ElementType::F32);
                    force_input_layout(graph, factory, n, input, &desired);
                }
            }
            NodeKind::BinaryConvolution => {
                if let Some(input) = graph.dependencies(n).first().copied() {
                    let current = graph.output_layout(input);
                    let desired = current.with_element_type(ElementType::Bin);
                    force_input_layout(graph, factory, n, input, &desired);
                }
            }
            NodeKind::Deconvolution => {
                let preferred = advisor.preferred_format(graph, n);
                if matches!(preferred, Fmt::BFsZyxFsv16 | Fmt::BsFsZyxBsv16Fsv16) {
                    if let Some(input) = graph.dependencies(n).first().copied() {
                        let current = graph.output_layout(input);
                        let desired = current.with_format(preferred);
                        force_input_layout(graph, factory, n, input, &desired);
                    }
                }
            }
            _ => {}
        }
    }
}
