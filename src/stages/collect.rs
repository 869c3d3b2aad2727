//! Stage 1 — Collect preferred formats (§4.1).

use log::trace;

use crate::advisor::LayoutAdvisor;
use crate::format_map::FormatMap;
use crate::graph::GraphLike;

/// For every data-flow node in processing order, query the advisor for its
/// preferred format and store it in `F`. Non-data-flow nodes are absent
/// from the returned map.
pub fn collect(graph: &dyn GraphLike, advisor: &dyn LayoutAdvisor) -> FormatMap {
    let mut f = FormatMap::new();
    for n in graph.processing_order() {
        if !graph.is_in_data_flow(n) {
            continue;
        }
        let preferred = advisor.preferred_format(graph, n);
        trace!("collect: {n} preferred={preferred}");
        f.set(n, preferred);
    }
    f
}
