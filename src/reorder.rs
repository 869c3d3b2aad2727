//! The reorder factory contract (§6 "Reorder factory contract").

use crate::format::Layout;
use crate::node::NodeId;

/// A reorder node ready to be spliced onto an edge, as produced by
/// [`ReorderFactory::get_reorder`]. Carries only what `materialize` and the
/// graph's `add_intermediate` need: the node's own output layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderOp {
    pub output_layout: Layout,
}

/// External collaborator: given a producer and the `in`/`out` layouts of a
/// prospective conversion, decides whether a reorder operator is needed at
/// all and, if so, whether it is freshly built or a shared/cached instance.
///
/// `existing_flag` in the returned pair controls how `add_intermediate`
/// rewires users: `true` means the op is an existing, possibly shared
/// reorder; `false` means a fresh node that only this edge will use.
pub trait ReorderFactory {
    fn get_reorder(
        &mut self,
        producer_id: NodeId,
        in_layout: &Layout,
        out_layout: &Layout,
    ) -> (Option<ReorderOp>, bool);
}

/// A reorder factory that always builds a fresh reorder node whenever the
/// `in`/`out` layouts actually differ, and returns `None` otherwise (the
/// "factory returns no reorder" / "no conversion needed" case of §7).
///
/// Caches one reorder per `(producer_id, out_layout)` pair so repeated
/// requests for the same conversion from the same producer report
/// `existing_flag = true` on the second and later calls, mirroring a real
/// factory's de-duplication.
#[derive(Debug, Default)]
pub struct DefaultReorderFactory {
    seen: std::collections::HashSet<(NodeId, Layout)>,
}

impl DefaultReorderFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReorderFactory for DefaultReorderFactory {
    fn get_reorder(
        &mut self,
        producer_id: NodeId,
        in_layout: &Layout,
        out_layout: &Layout,
    ) -> (Option<ReorderOp>, bool) {
        if in_layout.format == out_layout.format {
            return (None, false);
        }
        let key = (producer_id, out_layout.clone());
        let existing = !self.seen.insert(key);
        (
            Some(ReorderOp {
                output_layout: out_layout.clone(),
            }),
            existing,
        )
    }
}
