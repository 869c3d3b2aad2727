//! The format map `F: N -> Fmt` (§3 "Format map (`F`)").

use std::collections::BTreeMap;
use std::fmt;

use crate::format::Fmt;
use crate::node::NodeId;

/// `F`, defined only for data-flow nodes. Created fresh at pass start,
/// mutated only by this pass, single-valued at every moment.
#[derive(Debug, Clone, Default)]
pub struct FormatMap(BTreeMap<NodeId, Fmt>);

impl FormatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, n: NodeId) -> Option<Fmt> {
        self.0.get(&n).copied()
    }

    /// `F[n]`, defaulting to `Any` for nodes not yet present in the map
    /// (non-data-flow nodes, or nodes visited before `collect` runs).
    pub fn get_or_any(&self, n: NodeId) -> Fmt {
        self.0.get(&n).copied().unwrap_or(Fmt::Any)
    }

    pub fn set(&mut self, n: NodeId, fmt: Fmt) {
        self.0.insert(n, fmt);
    }

    pub fn is_any(&self, n: NodeId) -> bool {
        self.get_or_any(n).is_any()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Fmt)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.0.contains_key(&n)
    }
}

impl fmt::Display for FormatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, fmt_) in self.iter() {
            writeln!(f, "{n}\t{fmt_}")?;
        }
        Ok(())
    }
}
