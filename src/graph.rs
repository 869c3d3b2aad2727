//! The graph contract (§6 "Graph contract") plus `SimpleGraph`, a small
//! concrete, in-memory implementation.
//!
//! Topology, node creation and traversal order are external collaborators
//! per §1 — the real compiler graph is assumed provided. `SimpleGraph`
//! exists only so this crate is a runnable, testable whole rather than a
//! library of orphaned traits; it is deliberately minimal (see `DESIGN.md`
//! for the modeling simplifications it makes, e.g. pass-through output
//! layout recomputation).

use log::trace;

use crate::error::GraphError;
use crate::format::Layout;
use crate::node::{NodeId, NodeKind};
use crate::reorder::ReorderOp;

/// Accessors a graph must expose for this pass to run against it.
///
/// Accessors return owned values rather than borrows: the pass interleaves
/// reads of one node with mutation of others (`add_intermediate`,
/// `recalc_output_layout`), and keeping the trait borrow-free lets stages
/// hold a `&mut dyn GraphLike` without fighting the borrow checker over
/// interior structure the trait does not expose.
pub trait GraphLike {
    /// A fixed topological traversal, supplied by the graph.
    fn processing_order(&self) -> Vec<NodeId>;

    /// Upstream inputs, in order.
    fn dependencies(&self, n: NodeId) -> Vec<NodeId>;

    /// Downstream consumers.
    fn users(&self, n: NodeId) -> Vec<NodeId>;

    fn output_layout(&self, n: NodeId) -> Layout;

    fn kind(&self, n: NodeId) -> NodeKind;

    /// Whether `n` participates in tensor computation (as opposed to a
    /// constant or side-data node the pass must not touch).
    fn is_in_data_flow(&self, n: NodeId) -> bool;

    /// Splice `op` onto the edge `source -> sink`. `existing` mirrors the
    /// reorder factory's `existing_flag`: whether `op` is a fresh node this
    /// edge alone will use, or an existing/shared one.
    fn add_intermediate(&mut self, op: ReorderOp, sink: NodeId, source: NodeId, existing: bool) -> NodeId;

    /// Recompute `n`'s output layout from its (possibly just-rewired)
    /// inputs. `force` requests recomputation even if the graph believes
    /// nothing changed.
    fn recalc_output_layout(&mut self, n: NodeId, force: bool);

    /// Overwrite `n`'s output-layout *format* in place (shape and element
    /// type untouched) with the format this pass decided for it.
    ///
    /// A real compiler graph's per-op kernels already encode whichever
    /// format the pass settles on, so this has no independent effect there;
    /// `SimpleGraph`'s own `recalc_output_layout` only ever copies a format
    /// down from a node's first dependency, which never reaches a
    /// dependency-free source node and is only as correct as the upstream
    /// node's *own* physical layout already being in sync. Materialize calls
    /// this once per data-flow node, after reorder insertion, so re-running
    /// the pass sees the same physical formats it just decided rather than
    /// stale ones left over from before the pass ran (§8 invariant 4).
    fn set_output_format(&mut self, n: NodeId, format: crate::format::Fmt);
}

#[derive(Debug, Clone)]
struct NodeRecord {
    kind: NodeKind,
    layout: Layout,
    deps: Vec<NodeId>,
    users: Vec<NodeId>,
    in_data_flow: bool,
}

/// A small, linear-topological-order, in-memory graph.
///
/// Nodes must be added in topological order (each node's dependencies must
/// already exist); `SimpleGraph` does not reorder or validate acyclicity
/// beyond that.
#[derive(Debug, Clone, Default)]
pub struct SimpleGraph {
    nodes: Vec<NodeRecord>,
    order: Vec<NodeId>,
}

impl SimpleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data-flow node with the given dependencies, returning its id.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        layout: Layout,
        deps: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        self.add_node_impl(kind, layout, deps, true)
    }

    /// Add a non-data-flow node (constant, side data). The pass never
    /// assigns it a format and never touches its layout.
    pub fn add_side_node(
        &mut self,
        kind: NodeKind,
        layout: Layout,
        deps: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        self.add_node_impl(kind, layout, deps, false)
    }

    fn add_node_impl(
        &mut self,
        kind: NodeKind,
        layout: Layout,
        deps: &[NodeId],
        in_data_flow: bool,
    ) -> Result<NodeId, GraphError> {
        for d in deps {
            if d.0 >= self.nodes.len() {
                return Err(GraphError::UnknownNode(*d));
            }
        }
        let id = NodeId(self.nodes.len());
        for d in deps {
            if *d == id {
                return Err(GraphError::SelfLoop(id));
            }
            self.nodes[d.0].users.push(id);
        }
        self.nodes.push(NodeRecord {
            kind,
            layout,
            deps: deps.to_vec(),
            users: Vec::new(),
            in_data_flow,
        });
        self.order.push(id);
        Ok(id)
    }

    fn record(&self, n: NodeId) -> &NodeRecord {
        &self.nodes[n.0]
    }

    fn record_mut(&mut self, n: NodeId) -> &mut NodeRecord {
        &mut self.nodes[n.0]
    }

    /// Total number of nodes, data-flow and non-data-flow alike.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl GraphLike for SimpleGraph {
    fn processing_order(&self) -> Vec<NodeId> {
        self.order.clone()
    }

    fn dependencies(&self, n: NodeId) -> Vec<NodeId> {
        self.record(n).deps.clone()
    }

    fn users(&self, n: NodeId) -> Vec<NodeId> {
        self.record(n).users.clone()
    }

    fn output_layout(&self, n: NodeId) -> Layout {
        self.record(n).layout.clone()
    }

    fn kind(&self, n: NodeId) -> NodeKind {
        self.record(n).kind.clone()
    }

    fn is_in_data_flow(&self, n: NodeId) -> bool {
        self.record(n).in_data_flow
    }

    fn add_intermediate(
        &mut self,
        op: ReorderOp,
        sink: NodeId,
        source: NodeId,
        existing: bool,
    ) -> NodeId {
        let new_id = NodeId(self.nodes.len());
        trace!(
            "add_intermediate: splicing reorder {} between {} -> {} (existing={})",
            new_id,
            source,
            sink,
            existing
        );
        self.nodes.push(NodeRecord {
            kind: NodeKind::Reorder,
            layout: op.output_layout,
            deps: vec![source],
            users: vec![sink],
            in_data_flow: true,
        });

        if let Some(pos) = self.record(source).users.iter().position(|u| *u == sink) {
            self.record_mut(source).users[pos] = new_id;
        } else {
            self.record_mut(source).users.push(new_id);
        }
        if let Some(pos) = self.record(sink).deps.iter().position(|d| *d == source) {
            self.record_mut(sink).deps[pos] = new_id;
        } else {
            self.record_mut(sink).deps.push(new_id);
        }

        let insert_at = self
            .order
            .iter()
            .position(|n| *n == sink)
            .unwrap_or(self.order.len());
        self.order.insert(insert_at, new_id);
        new_id
    }

    fn recalc_output_layout(&mut self, n: NodeId, force: bool) {
        if matches!(self.record(n).kind, NodeKind::Reorder) {
            // A reorder's output format was fixed by the factory at
            // construction time; it never changes.
            return;
        }
        let Some(&first_dep) = self.record(n).deps.first() else {
            return;
        };
        let upstream_format = self.record(first_dep).layout.format;
        let current = &mut self.record_mut(n).layout;
        if force || current.format != upstream_format {
            current.format = upstream_format;
        }
    }

    fn set_output_format(&mut self, n: NodeId, format: crate::format::Fmt) {
        if matches!(self.record(n).kind, NodeKind::Reorder) {
            // Same rationale as `recalc_output_layout`: a reorder's format
            // was fixed by the factory at construction time.
            return;
        }
        self.record_mut(n).layout.format = format;
    }
}
