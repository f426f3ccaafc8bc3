//! tm-rudy: incremental tile-based wire-density estimation (RUDY).
//!
//! The grid is built once from a placement snapshot and the network's
//! fan-in structure, then serves committed incremental updates and cheap
//! speculative what-if queries that roll back in time bounded by the
//! query's footprint.

pub mod grid;

pub use grid::{Grid, GridError, View};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
