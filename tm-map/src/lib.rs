//! tm-map: multi-objective candidate selection and the mapping adapter.
//!
//! The adapter realizes MCTS actions: it extracts the best slice of one
//! metric's candidate queue, commits those implementation choices under a
//! first-writer-wins lock, legalizes the remainder from a minimal gate
//! set, and scores the result through an external timing/area oracle.

pub mod adapter;
pub mod queues;
pub mod stubs;

pub use adapter::{
    AdapterPaths, BoundGate, CandidateGenerator, MapAdapter, MapError, OracleError, ScoredMatch,
    TimingOracle,
};
pub use queues::CandidateQueues;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod adapter_tests;
#[cfg(test)]
mod queues_tests;
