//! Deterministic external collaborators for tests and smoke runs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tm_core::network::{Network, NodeIndex};

use crate::adapter::{CandidateGenerator, OracleError, ScoredMatch, TimingOracle};

/// Table-driven candidate generator.
#[derive(Debug, Default, Clone)]
pub struct StubGenerator {
    matches: HashMap<(NodeIndex, u8), Vec<ScoredMatch>>,
    base: HashMap<(NodeIndex, u8), ScoredMatch>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two alternatives per non-input node and phase over the fan-in cut:
    /// supergate 0 is fast and big, supergate 1 slow and small. The
    /// minimal-library fallback is supergate 9, slower and bigger than
    /// both.
    pub fn from_network(network: &Network) -> Self {
        let mut g = Self::new();
        for node in 0..network.len() {
            if network.is_input(node) {
                continue;
            }
            let leaves = network.fanins(node).to_vec();
            let k = leaves.len();
            for phase in 0..2u8 {
                g.add_match(
                    node,
                    phase,
                    ScoredMatch {
                        cut: 0,
                        supergate: 0,
                        area: 2.0,
                        pin_delays: vec![1.0; k],
                        leaves: leaves.clone(),
                    },
                );
                g.add_match(
                    node,
                    phase,
                    ScoredMatch {
                        cut: 0,
                        supergate: 1,
                        area: 1.0,
                        pin_delays: vec![2.0; k],
                        leaves: leaves.clone(),
                    },
                );
                g.set_base(
                    node,
                    phase,
                    ScoredMatch {
                        cut: 0,
                        supergate: 9,
                        area: 3.0,
                        pin_delays: vec![2.5; k],
                        leaves: leaves.clone(),
                    },
                );
            }
        }
        g
    }

    pub fn add_match(&mut self, node: NodeIndex, phase: u8, m: ScoredMatch) {
        self.matches.entry((node, phase)).or_default().push(m);
    }

    pub fn set_base(&mut self, node: NodeIndex, phase: u8, m: ScoredMatch) {
        self.base.insert((node, phase), m);
    }

    /// Make the minimal library unable to cover `node`.
    pub fn remove_base(&mut self, node: NodeIndex, phase: u8) {
        self.base.remove(&(node, phase));
    }
}

impl CandidateGenerator for StubGenerator {
    fn matches(&self, node: NodeIndex, phase: u8) -> Vec<ScoredMatch> {
        self.matches.get(&(node, phase)).cloned().unwrap_or_default()
    }

    fn base_match(&self, node: NodeIndex, phase: u8) -> Option<ScoredMatch> {
        self.base.get(&(node, phase)).cloned()
    }
}

/// Deterministic oracle: reads the scratch netlist and derives delay and
/// area from the bound supergate ids, so committing cheaper supergates
/// visibly improves the reward.
#[derive(Debug, Default, Clone)]
pub struct CountingOracle;

impl TimingOracle for CountingOracle {
    fn evaluate(&mut self, _library: &Path, netlist: &Path) -> Result<(f64, f64), OracleError> {
        let text = fs::read_to_string(netlist)?;
        let mut supergate_sum = 0u64;
        let mut gates = 0u64;
        for line in text.lines() {
            let mut fields = line.split_whitespace();
            if fields.next() != Some("gate") {
                continue;
            }
            // Line layout: gate <node> <phase> <cut> <supergate> <x> <y> ...
            let sg = fields
                .nth(3)
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| OracleError::Malformed(line.to_string()))?;
            supergate_sum += sg;
            gates += 1;
        }
        let delay = 1.0 + 0.05 * supergate_sum as f64;
        let area = 1.0 + 0.5 * gates as f64;
        Ok((delay, area))
    }
}
