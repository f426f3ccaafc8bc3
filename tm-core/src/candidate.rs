//! The four-metric action space and scored implementation candidates.
//!
//! Action space size: ACTIONS = 4
//! - idx 0: Delay
//! - idx 1: Area
//! - idx 2: Wirelength
//! - idx 3: TotalWirelength

use crate::network::NodeIndex;

/// Number of search actions (one per objective).
pub const ACTIONS: usize = 4;

/// Polarity phases per node (positive, negative).
pub const PHASES: usize = 2;

/// One optimization objective, doubling as one MCTS action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Delay,
    Area,
    Wirelength,
    TotalWirelength,
}

impl Metric {
    pub const ALL: [Metric; ACTIONS] = [
        Metric::Delay,
        Metric::Area,
        Metric::Wirelength,
        Metric::TotalWirelength,
    ];

    pub fn from_index(idx: usize) -> Option<Metric> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Metric::Delay => 0,
            Metric::Area => 1,
            Metric::Wirelength => 2,
            Metric::TotalWirelength => 3,
        }
    }
}

/// One way to implement one polarity phase of one node.
///
/// Scores are gains (negative cost): larger is better. Candidates are
/// immutable once created; several may target the same `(node, phase)` as
/// mutually exclusive alternatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub node: NodeIndex,
    pub phase: u8,
    pub cut: u32,
    pub supergate: u32,
    pub area: f64,
    pub delay: f64,
    pub wirelength: f64,
    pub total_wirelength: f64,
}

impl Candidate {
    pub fn gain(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Delay => self.delay,
            Metric::Area => self.area,
            Metric::Wirelength => self.wirelength,
            Metric::TotalWirelength => self.total_wirelength,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_index_roundtrip() {
        for (i, m) in Metric::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
            assert_eq!(Metric::from_index(i), Some(*m));
        }
        assert_eq!(Metric::from_index(ACTIONS), None);
    }
}
