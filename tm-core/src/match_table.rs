//! Per-node commitment records for the mapping search.
//!
//! One `NodeMatch` per network node. The `set` flag is a commitment lock:
//! it goes false -> true within a search step and is only cleared by
//! `reinit` at the start of a new rollout. The table is the single owner of
//! commitment state; passes borrow it exclusively.

use crate::candidate::PHASES;
use crate::network::NodeIndex;

/// Chosen implementation for one polarity phase of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseMatch {
    pub cut: u32,
    pub supergate: u32,
    /// Commitment lock: first writer wins until the next `reinit`.
    pub set: bool,
    pub area: f64,
    pub wirelength: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMatch {
    pub phases: [PhaseMatch; PHASES],
    pub arrival: [f64; PHASES],
    pub required: [f64; PHASES],
}

#[derive(Debug, Clone)]
pub struct MatchTable {
    rows: Vec<NodeMatch>,
}

impl MatchTable {
    pub fn new(nodes: usize) -> Self {
        Self {
            rows: vec![NodeMatch::default(); nodes],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, node: NodeIndex) -> &NodeMatch {
        &self.rows[node]
    }

    pub fn get_mut(&mut self, node: NodeIndex) -> &mut NodeMatch {
        &mut self.rows[node]
    }

    /// Commit an implementation for `(node, phase)` unless one is already
    /// locked in. Returns whether this call was the first writer.
    pub fn try_commit(
        &mut self,
        node: NodeIndex,
        phase: u8,
        cut: u32,
        supergate: u32,
        area: f64,
        wirelength: f64,
    ) -> bool {
        let slot = &mut self.rows[node].phases[phase as usize];
        if slot.set {
            return false;
        }
        *slot = PhaseMatch {
            cut,
            supergate,
            set: true,
            area,
            wirelength,
        };
        true
    }

    /// Number of nodes with at least one committed phase.
    pub fn committed_nodes(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.phases.iter().any(|p| p.set))
            .count()
    }

    /// Clear all commitments and timing slots. Called once per rollout.
    pub fn reinit(&mut self) {
        for row in &mut self.rows {
            *row = NodeMatch::default();
        }
    }
}
