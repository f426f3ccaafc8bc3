//! Fan-in DAG model of the subject network.
//!
//! The mapping core never parses netlist files; callers hand it the fan-in
//! structure directly. Nets are derived as driver-plus-fanouts pin lists.

use thiserror::Error;

/// Index of a node in the network.
pub type NodeIndex = usize;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("fan-in {fanin} of node {node} is out of range (network has {len} nodes)")]
    FaninOutOfRange {
        node: NodeIndex,
        fanin: NodeIndex,
        len: usize,
    },
    #[error("network contains a combinational cycle")]
    Cycle,
}

/// Immutable fan-in DAG. Nodes with no fan-ins are primary inputs.
#[derive(Debug, Clone)]
pub struct Network {
    fanins: Vec<Vec<NodeIndex>>,
    fanouts: Vec<Vec<NodeIndex>>,
    topo: Vec<NodeIndex>,
}

impl Network {
    /// Validate fan-in indices and acyclicity, and precompute fanouts and a
    /// topological order (inputs first).
    pub fn new(fanins: Vec<Vec<NodeIndex>>) -> Result<Self, NetworkError> {
        let len = fanins.len();
        let mut fanouts: Vec<Vec<NodeIndex>> = vec![Vec::new(); len];
        for (node, fis) in fanins.iter().enumerate() {
            for &fi in fis {
                if fi >= len {
                    return Err(NetworkError::FaninOutOfRange {
                        node,
                        fanin: fi,
                        len,
                    });
                }
                fanouts[fi].push(node);
            }
        }

        // Kahn's algorithm.
        let mut indeg: Vec<usize> = fanins.iter().map(|f| f.len()).collect();
        let mut ready: Vec<NodeIndex> = (0..len).filter(|&n| indeg[n] == 0).collect();
        let mut topo = Vec::with_capacity(len);
        while let Some(n) = ready.pop() {
            topo.push(n);
            for &fo in &fanouts[n] {
                indeg[fo] -= 1;
                if indeg[fo] == 0 {
                    ready.push(fo);
                }
            }
        }
        if topo.len() != len {
            return Err(NetworkError::Cycle);
        }

        Ok(Self {
            fanins,
            fanouts,
            topo,
        })
    }

    pub fn len(&self) -> usize {
        self.fanins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fanins.is_empty()
    }

    pub fn fanins(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.fanins[node]
    }

    pub fn fanouts(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.fanouts[node]
    }

    pub fn is_input(&self, node: NodeIndex) -> bool {
        self.fanins[node].is_empty()
    }

    /// Topological order, inputs first.
    pub fn topo_order(&self) -> &[NodeIndex] {
        &self.topo
    }

    /// Fanout-free nodes (the network's outputs).
    pub fn outputs(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.len()).filter(|&n| self.fanouts[n].is_empty())
    }

    /// The net driven by `node`: the driver followed by its fanouts.
    pub fn net(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut pins = Vec::with_capacity(1 + self.fanouts[node].len());
        pins.push(node);
        pins.extend_from_slice(&self.fanouts[node]);
        pins
    }
}
