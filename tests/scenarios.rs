//! Black-box end-to-end scenarios (§8 S1-S6) plus the round-trip/algebraic
//! laws, run against `SimpleGraph` and the `TestAdvisor`/`DefaultReorderFactory`
//! doubles in `tests/common`.

mod common;

use common::TestAdvisor;
use layout_reorder::graph::{GraphLike, SimpleGraph};
use layout_reorder::node::{ConvAttrs, MvnAttrs, NodeKind};
use layout_reorder::reorder::DefaultReorderFactory;
use layout_reorder::{ElementType, Fmt, Layout, LayoutReorderPass};

fn layout(fmt: Fmt) -> Layout {
    Layout::new(fmt, ElementType::F32, [1, 16, 4, 4])
}

/// S1 — linear chain, uniform preference. Expect `F = {bfyx, bfyx, bfyx}`,
/// zero reorders inserted.
#[test]
fn s1_linear_chain_uniform_preference() {
    let mut g = SimpleGraph::new();
    let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
    let b = g.add_node(NodeKind::Generic("b"), layout(Fmt::Bfyx), &[a]).unwrap();
    let c = g.add_node(NodeKind::Generic("c"), layout(Fmt::Bfyx), &[b]).unwrap();

    let advisor = TestAdvisor::new().prefer(a, Fmt::Bfyx).prefer(b, Fmt::Bfyx).prefer(c, Fmt::Bfyx);
    let mut factory = DefaultReorderFactory::new();
    let (f, stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    assert_eq!(f.get(a), Some(Fmt::Bfyx));
    assert_eq!(f.get(b), Some(Fmt::Bfyx));
    assert_eq!(f.get(c), Some(Fmt::Bfyx));
    assert_eq!(stats.materialized_reorders, 0);
    assert_eq!(g.len(), 3);
}

/// S2 — propagation through ANY. Chain A->B->C->D; A=D=fsv16, B=C=ANY,
/// fsv16 supported everywhere, no fuses possible. Expect all four nodes at
/// fsv16, zero reorders.
#[test]
fn s2_propagation_through_any() {
    let mut g = SimpleGraph::new();
    let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
    let b = g.add_node(NodeKind::Generic("b"), layout(Fmt::Bfyx), &[a]).unwrap();
    let c = g.add_node(NodeKind::Generic("c"), layout(Fmt::Bfyx), &[b]).unwrap();
    let d = g.add_node(NodeKind::Generic("d"), layout(Fmt::Bfyx), &[c]).unwrap();

    let advisor = TestAdvisor::new().prefer(a, Fmt::BFsYxFsv16).prefer(d, Fmt::BFsYxFsv16);
    let mut factory = DefaultReorderFactory::new();
    let (f, stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    for n in [a, b, c, d] {
        assert_eq!(f.get(n), Some(Fmt::BFsYxFsv16));
    }
    assert_eq!(stats.materialized_reorders, 0);
    assert_eq!(g.len(), 4);
}

/// S3 — propagation blocked by unsupported middle. Same chain, advisor does
/// not support fsv16 on C. Propagation can't cross C, so Minimize decides
/// B and C independently, in processing order: B has only A (fsv16) as a
/// resolved neighbor yet, and adopting fsv16 there strictly beats its own
/// bfyx layout (zero local mismatches vs. one); C is minimized next, by
/// which point both its neighbors (B, D) are fsv16 — a format C doesn't
/// support — so it falls back to its own bfyx layout. Either way exactly
/// two reorders are needed to cross the B/C boundary that propagation
/// couldn't.
#[test]
fn s3_propagation_blocked_by_unsupported_middle() {
    let mut g = SimpleGraph::new();
    let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
    let b = g.add_node(NodeKind::Generic("b"), layout(Fmt::Bfyx), &[a]).unwrap();
    let c = g.add_node(NodeKind::Generic("c"), layout(Fmt::Bfyx), &[b]).unwrap();
    let d = g.add_node(NodeKind::Generic("d"), layout(Fmt::Bfyx), &[c]).unwrap();

    let advisor = TestAdvisor::new()
        .prefer(a, Fmt::BFsYxFsv16)
        .prefer(d, Fmt::BFsYxFsv16)
        .unsupport(c, Fmt::BFsYxFsv16);
    let mut factory = DefaultReorderFactory::new();
    let (f, stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    assert_eq!(f.get(a), Some(Fmt::BFsYxFsv16));
    assert_eq!(f.get(d), Some(Fmt::BFsYxFsv16));
    assert_eq!(f.get(b), Some(Fmt::BFsYxFsv16));
    assert_eq!(f.get(c), Some(Fmt::Bfyx));
    assert_eq!(stats.materialized_reorders, 2);
    assert_eq!(g.len(), 6);
}

/// S4 — fully-connected override. Input has format `b_fs_yx_fsv16`; the
/// advisor can fuse `(b_fs_yx_fsv16 -> bfyx)` at `input->fc`, and the
/// backward admissibility check succeeds. Expect the override to demote
/// `F[fc] := bfyx` ahead of Propagate, and for that decision to survive
/// Propagate's own pass over `fc` as a concrete seed in its own right (it
/// only reaches `input` through the same fusible boundary it was demoted
/// across, which leaves `input`'s hard preference untouched rather than
/// carrying it back onto `fc`).
#[test]
fn s4_fully_connected_override_demotes_to_bfyx() {
    let mut g = SimpleGraph::new();
    let input = g
        .add_node(NodeKind::Generic("input"), layout(Fmt::BFsYxFsv16), &[])
        .unwrap();
    let fc = g.add_node(NodeKind::FullyConnected, layout(Fmt::Yxfb), &[input]).unwrap();

    let advisor = TestAdvisor::new()
        .prefer(input, Fmt::BFsYxFsv16)
        .fuse(input, fc, Fmt::BFsYxFsv16, Fmt::Bfyx);
    let mut factory = DefaultReorderFactory::new();
    let (f, _stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    assert_eq!(f.get(input), Some(Fmt::BFsYxFsv16));
    assert_eq!(f.get(fc), Some(Fmt::Bfyx));
}

/// S5 — int8 mvn->conv->mvn workaround. Subgraph
/// `mvn_in(i8, fsv16, 16x1280x720) -> conv(byxf_af32, 3x3, out_feat=3) ->
/// mvn_out(bfyx, across_channels=false)`, network flag set. Expect after
/// the pass `F[conv] = F[mvn_out] = b_fs_yx_fsv16`.
#[test]
fn s5_int8_mvn_conv_mvn_workaround() {
    let mut g = SimpleGraph::new();
    let mvn_in = g
        .add_node(
            NodeKind::Mvn(MvnAttrs { across_channels: true }),
            Layout::new(Fmt::BFsYxFsv16, ElementType::I8, [1, 16, 720, 1280]),
            &[],
        )
        .unwrap();
    let conv_attrs = ConvAttrs {
        kernel: (3, 3),
        input_feature: 16,
        output_feature: 3,
        spatial: (1280, 720),
        weights_are_int8: true,
        default_strides_and_pads: true,
    };
    let conv = g
        .add_node(
            NodeKind::Convolution(conv_attrs),
            Layout::new(Fmt::ByxfAf32, ElementType::I8, [1, 3, 720, 1280]),
            &[mvn_in],
        )
        .unwrap();
    let mvn_out = g
        .add_node(
            NodeKind::Mvn(MvnAttrs { across_channels: false }),
            Layout::new(Fmt::Bfyx, ElementType::F32, [1, 3, 720, 1280]),
            &[conv],
        )
        .unwrap();

    let advisor = TestAdvisor::new()
        .prefer(mvn_in, Fmt::BFsYxFsv16)
        .prefer(conv, Fmt::ByxfAf32)
        .prefer(mvn_out, Fmt::Bfyx)
        .network_flag(true);
    let mut factory = DefaultReorderFactory::new();
    let (f, _stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    assert_eq!(f.get(conv), Some(Fmt::BFsYxFsv16));
    assert_eq!(f.get(mvn_out), Some(Fmt::BFsYxFsv16));
}

/// S6 — local minimization tie-break. Node X has one predecessor at bfyx
/// and two users at fsv16; both formats supported at X. Expect
/// `F[X] = fsv16` (count 1 beats count 2).
#[test]
fn s6_minimize_favors_majority_neighbor_format() {
    let mut g = SimpleGraph::new();
    let pred = g.add_node(NodeKind::Generic("pred"), layout(Fmt::Bfyx), &[]).unwrap();
    let x = g.add_node(NodeKind::Generic("x"), layout(Fmt::Bfyx), &[pred]).unwrap();
    let u1 = g.add_node(NodeKind::Generic("u1"), layout(Fmt::BFsYxFsv16), &[x]).unwrap();
    let u2 = g.add_node(NodeKind::Generic("u2"), layout(Fmt::BFsYxFsv16), &[x]).unwrap();

    let advisor = TestAdvisor::new()
        .prefer(pred, Fmt::Bfyx)
        .prefer(u1, Fmt::BFsYxFsv16)
        .prefer(u2, Fmt::BFsYxFsv16);
    let mut factory = DefaultReorderFactory::new();
    let (f, _stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    assert_eq!(f.get(x), Some(Fmt::BFsYxFsv16));
}

/// Invariant 1 (§8): for every edge with differing concrete formats, either
/// fusible or a reorder was inserted. Checked over the S3 graph, which
/// exercises both a reorder-bearing boundary and (via S4 below) a fusible
/// one.
#[test]
fn invariant_every_differing_edge_is_fused_or_reordered() {
    let mut g = SimpleGraph::new();
    let input = g
        .add_node(NodeKind::Generic("input"), layout(Fmt::BFsYxFsv16), &[])
        .unwrap();
    let fc = g.add_node(NodeKind::FullyConnected, layout(Fmt::Yxfb), &[input]).unwrap();

    let advisor = TestAdvisor::new()
        .prefer(input, Fmt::BFsYxFsv16)
        .fuse(input, fc, Fmt::BFsYxFsv16, Fmt::Bfyx);
    let mut factory = DefaultReorderFactory::new();
    let (f, _stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    // fc was demoted to bfyx and the input->fc conversion is fusible, so no
    // reorder node should have been inserted on that edge.
    assert_eq!(f.get(input), Some(Fmt::BFsYxFsv16));
    assert_eq!(f.get(fc), Some(Fmt::Bfyx));
    assert_eq!(g.len(), 2);
}

/// Invariant 6 (§8): if every node's preference is concrete, Propagate and
/// Minimize make no changes — `F` is exactly the preferences, and (since
/// they already agree pairwise here) no reorders are inserted.
#[test]
fn invariant_all_concrete_preferences_are_left_untouched() {
    let mut g = SimpleGraph::new();
    let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
    let b = g.add_node(NodeKind::Generic("b"), layout(Fmt::Bfyx), &[a]).unwrap();

    let advisor = TestAdvisor::new().prefer(a, Fmt::Bfyx).prefer(b, Fmt::Bfyx);
    let mut factory = DefaultReorderFactory::new();
    let (f, stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    assert_eq!(f.get(a), Some(Fmt::Bfyx));
    assert_eq!(f.get(b), Some(Fmt::Bfyx));
    assert_eq!(stats.materialized_reorders, 0);
}

/// Invariant 4 (§8): idempotent on its own output. Running the pass again
/// on the resulting graph must insert no new reorder nodes.
#[test]
fn invariant_idempotent_on_its_own_output() {
    let mut g = SimpleGraph::new();
    let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
    let b = g.add_node(NodeKind::Generic("b"), layout(Fmt::Bfyx), &[a]).unwrap();
    let c = g.add_node(NodeKind::Generic("c"), layout(Fmt::Bfyx), &[b]).unwrap();
    let d = g.add_node(NodeKind::Generic("d"), layout(Fmt::Bfyx), &[c]).unwrap();

    let advisor = TestAdvisor::new()
        .prefer(a, Fmt::BFsYxFsv16)
        .prefer(d, Fmt::BFsYxFsv16)
        .unsupport(c, Fmt::BFsYxFsv16);
    let mut factory = DefaultReorderFactory::new();

    let pass = LayoutReorderPass::new();
    let (_, stats1) = pass.run(&mut g, &advisor, &mut factory);
    let len_after_first = g.len();

    let (_, stats2) = pass.run(&mut g, &advisor, &mut factory);
    assert_eq!(g.len(), len_after_first);
    assert_eq!(stats1.materialized_reorders, stats2.materialized_reorders);
}

/// Invariant 7 (§8): if every node's preference is `Any`, the final
/// assignment only ever uses formats drawn from the graph's own
/// output-layout formats (plus `Any`) — minimize's fallback can never
/// invent a format nobody in the graph already has.
#[test]
fn invariant_all_any_preferences_draw_from_existing_output_formats() {
    let mut g = SimpleGraph::new();
    let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
    let b = g
        .add_node(NodeKind::Generic("b"), layout(Fmt::BFsYxFsv16), &[a])
        .unwrap();
    let c = g.add_node(NodeKind::Generic("c"), layout(Fmt::Bfyx), &[b]).unwrap();

    let advisor = TestAdvisor::new();
    let mut factory = DefaultReorderFactory::new();
    let (f, _stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);

    let allowed = [Fmt::Bfyx, Fmt::BFsYxFsv16];
    for n in [a, b, c] {
        let assigned = f.get_or_any(n);
        assert!(assigned.is_any() || allowed.contains(&assigned));
    }
}

/// Determinism (§8 invariant 5, §5's ordering guarantee): two runs on
/// structurally identical inputs produce the same format map and the same
/// number of materialized reorders.
#[test]
fn invariant_deterministic_across_structurally_identical_runs() {
    fn build_and_run() -> (layout_reorder::FormatMap, usize) {
        let mut g = SimpleGraph::new();
        let a = g.add_node(NodeKind::Generic("a"), layout(Fmt::Bfyx), &[]).unwrap();
        let b = g.add_node(NodeKind::Generic("b"), layout(Fmt::Bfyx), &[a]).unwrap();
        let c = g.add_node(NodeKind::Generic("c"), layout(Fmt::Bfyx), &[b]).unwrap();
        let d = g.add_node(NodeKind::Generic("d"), layout(Fmt::Bfyx), &[c]).unwrap();
        let advisor = TestAdvisor::new()
            .prefer(a, Fmt::BFsYxFsv16)
            .prefer(d, Fmt::BFsYxFsv16)
            .unsupport(c, Fmt::BFsYxFsv16);
        let mut factory = DefaultReorderFactory::new();
        let (f, stats) = LayoutReorderPass::new().run(&mut g, &advisor, &mut factory);
        (f, stats.materialized_reorders)
    }

    let (f1, count1) = build_and_run();
    let (f2, count2) = build_and_run();
    assert_eq!(count1, count2);
    assert_eq!(f1.iter().collect::<Vec<_>>(), f2.iter().collect::<Vec<_>>());
}
