//! Tensor memory formats and layouts (§3 of the design: "Format (`Fmt`)").

use std::fmt;

/// A physical tensor memory arrangement.
///
/// Formats are opaque to the pass itself except for the two advisor
/// predicates (`is_format_supported`, `can_fuse_reorder`) and the `is_image`
/// classification used by `materialize` to skip image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fmt {
    /// Unconstrained / to be decided.
    Any,
    Bfyx,
    Yxfb,
    BFsYxFsv4,
    BFsYxFsv16,
    BFsYxFsv32,
    FsBYxFsv32,
    BFsZyxFsv16,
    BFsZyxFsv32,
    BsFsZyxBsv16Fsv16,
    ByxfAf32,
    Bin,
    /// `b_fs_yx_fsv16` variant of image layouts, kept distinct from the
    /// ordinary `BFsYxFsv16` so `is_image` can single it out.
    ImageByxf,
    Image2dWeights,
}

impl Fmt {
    /// The handful of formats the fully-connected demotion override (§6.1)
    /// checks as fusable sources into `bfyx`.
    pub const FC_DEMOTION_CANDIDATES: &'static [Fmt] = &[
        Fmt::FsBYxFsv32,
        Fmt::BFsYxFsv4,
        Fmt::BFsYxFsv16,
        Fmt::BFsYxFsv32,
        Fmt::BFsZyxFsv32,
        Fmt::ByxfAf32,
    ];

    /// Image formats are conceptually special-cased by the runtime and
    /// skipped during reorder materialization (§4.4).
    pub fn is_image(self) -> bool {
        matches!(self, Fmt::ImageByxf | Fmt::Image2dWeights)
    }

    pub fn is_any(self) -> bool {
        matches!(self, Fmt::Any)
    }
}

impl fmt::Display for Fmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Element (scalar) type carried by a tensor. Only the handful of variants
/// the overrides in §6 care about are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    I8,
    Bin,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A concrete tensor layout: format, element type, and shape.
///
/// Shapes are kept as a flat `Vec<usize>` (batch, feature, spatial...) since
/// the pass never interprets individual axes beyond computing an element
/// count for the minimize metric's `volume` term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Layout {
    pub format: Fmt,
    pub element_type: ElementType,
    pub shape: Vec<usize>,
}

impl Layout {
    pub fn new(format: Fmt, element_type: ElementType, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            format,
            element_type,
            shape: shape.into(),
        }
    }

    /// Total element count, used as the `volume` term of the minimize
    /// metric (§4.3) and for shaping reorder descriptors.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns a copy of this layout with `format` replaced, as used when
    /// building the `in`/`out` layout pair handed to the reorder factory.
    pub fn with_format(&self, format: Fmt) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }

    pub fn with_element_type(&self, element_type: ElementType) -> Self {
        Self {
            element_type,
            ..self.clone()
        }
    }
}
