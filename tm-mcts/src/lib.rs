//! tm-mcts: generic Monte-Carlo tree search over adapter actions.
//!
//! The driver is generic over a [`SearchAdapter`] that realizes actions
//! and returns scalar rewards (minimized). The design uses:
//! - a fixed action space reported by the adapter
//! - arena-backed state storage with father links by index
//! - a position-keyed dedup map for expansions

pub mod arena;
pub mod driver;
pub mod state;

pub use arena::Arena;
pub use driver::{Mcts, MctsConfig, MctsError, RolloutStat, SearchAdapter, SearchStats};
pub use state::{State, StateId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
