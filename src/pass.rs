//! Top-level wiring: `LayoutReorderPass::run` (§2's five-stage pipeline,
//! plus the override hooks of §6).

use log::info;

use crate::advisor::LayoutAdvisor;
use crate::format_map::FormatMap;
use crate::graph::GraphLike;
use crate::reorder::ReorderFactory;
use crate::stages::{collect, materialize, minimize, overrides, propagate};
use crate::stats::{self, Stats};

/// The pass proper. Holds no state of its own beyond the duration of
/// [`run`](Self::run): `F` is created, owned, and dropped within one call
/// (§5 "Concurrency & Resource Model").
#[derive(Debug, Default)]
pub struct LayoutReorderPass;

impl LayoutReorderPass {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline against `graph`, consulting `advisor` for
    /// preferences/support/fusing and `factory` for reorder construction.
    ///
    /// Order, per §2 and §5:
    /// 1. Collect preferred formats.
    /// 2. Apply pre-propagation overrides (§6.1: fully-connected demotion;
    ///    §6.2: int8 mvn->conv->mvn pattern).
    /// 3. Propagate concrete formats into `Any` regions.
    /// 4. Minimize local reorders at nodes whose advisor preference was
    ///    `Any`.
    /// 5. Materialize reorders, then recompute output layouts.
    /// 6. Apply post-materialization per-kind input reorders (§6.3).
    ///
    /// Returns the final format map and diagnostic statistics (§4.5).
    /// `fusible_reorders`/`nodes_with_fusible_incoming` are computed against
    /// the format map right before materialization mutates the graph, so
    /// they reflect what materialize is about to skip via fusing.
    /// `materialized_reorders` is filled in afterward, once materialize and
    /// the post-materialization overrides have both had a chance to splice
    /// `Reorder` nodes into the graph — counting it any earlier would always
    /// read zero.
    pub fn run(
        &self,
        graph: &mut dyn GraphLike,
        advisor: &dyn LayoutAdvisor,
        factory: &mut dyn ReorderFactory,
    ) -> (FormatMap, Stats) {
        info!("layout-reorder: collecting preferred formats");
        let mut f = collect::collect(graph, advisor);
        let preferences = f.clone();

        overrides::apply_fully_connected_demotion(graph, advisor, &mut f);
        overrides::apply_int8_mvn_conv_mvn_pattern(graph, advisor, &mut f);

        info!("layout-reorder: propagating formats");
        propagate::propagate(graph, advisor, &mut f);

        info!("layout-reorder: minimizing local reorders");
        minimize::minimize(graph, advisor, &preferences, &mut f);

        let mut stats = stats::compute_statistics(graph, advisor, &f);

        info!("layout-reorder: materializing reorders");
        materialize::materialize(graph, advisor, factory, &f);

        overrides::apply_post_materialization_overrides(graph, advisor, factory);

        // Only countable now: `materialize` and the post-materialization
        // overrides are what actually splice `Reorder` nodes into the graph.
        stats.materialized_reorders = stats::count_materialized_reorders(graph);

        info!(
            "layout-reorder: done ({} fusible, {} materialized)",
            stats.fusible_reorders, stats.materialized_reorders
        );
        (f, stats)
    }
}
