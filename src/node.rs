//! Node identities and the opaque `NodeKind` the overrides in §6 key on.

use std::fmt;

/// Stable identity of a graph vertex. The graph owns nodes; `NodeId` is a
/// back-reference only and never extends a node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attributes of a convolution node relevant to the int8 `mvn->conv->mvn`
/// pattern-match workaround (§6.2). Only the fields that workaround inspects
/// are modeled; everything else about a real convolution is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvAttrs {
    pub kernel: (usize, usize),
    pub input_feature: usize,
    pub output_feature: usize,
    /// Spatial extent as (width, height).
    pub spatial: (usize, usize),
    pub weights_are_int8: bool,
    /// Whether stride, dilation and padding are all at their default
    /// (identity) values. The pattern in §6.2 requires this.
    pub default_strides_and_pads: bool,
}

impl ConvAttrs {
    /// Whether this convolution matches the exact shape fixture the int8
    /// `mvn->conv->mvn` workaround pattern-matches on (§6.2, §9 "treat their
    /// coordinates ... as unit-test fixtures, not as general logic").
    pub fn matches_int8_pattern_fixture(&self) -> bool {
        self.kernel == (3, 3)
            && self.input_feature == 16
            && self.output_feature == 3
            && self.spatial == (1280, 720)
            && self.weights_are_int8
            && self.default_strides_and_pads
    }
}

/// Attributes of an MVN (mean-variance-normalization) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MvnAttrs {
    pub across_channels: bool,
}

/// An opaque operator kind. The pass core never inspects these beyond
/// dispatch; the typed payloads exist only so the §6 overrides can recover
/// the specific attributes they key on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    FullyConnected,
    Convolution(ConvAttrs),
    Deconvolution,
    BinaryConvolution,
    DetectionOutput,
    Mvn(MvnAttrs),
    /// A reorder node previously inserted by this pass (or a prior run of
    /// it). Used by `stats` to count materialized reorders and by the
    /// idempotency property (§8 invariant 4) to recognize them.
    Reorder,
    /// Any node kind the overrides in §6 do not special-case.
    Generic(&'static str),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::FullyConnected => "fully_connected",
            NodeKind::Convolution(_) => "convolution",
            NodeKind::Deconvolution => "deconvolution",
            NodeKind::BinaryConvolution => "binary_convolution",
            NodeKind::DetectionOutput => "detection_output",
            NodeKind::Mvn(_) => "mvn",
            NodeKind::Reorder => "reorder",
            NodeKind::Generic(name) => name,
        }
    }
}

/// Flag bag read by the override rules (§6 "Advisor contract",
/// `get_optimization_attributes`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationAttributes {
    pub b_fs_yx_fsv16_network: bool,
}
