//! tm-core: shared domain types for the mapping search engine.
//!
//! Geometry primitives, the network/placement model, candidate and
//! node-match records, the four-metric action space, and the unified
//! YAML configuration.

pub mod candidate;
pub mod config;
pub mod geom;
pub mod match_table;
pub mod network;

pub use candidate::{Candidate, Metric, ACTIONS, PHASES};
pub use config::{Config, ConfigError};
pub use geom::{Point, Rect};
pub use match_table::{MatchTable, NodeMatch, PhaseMatch};
pub use network::{Network, NetworkError, NodeIndex};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
