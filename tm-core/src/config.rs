//! Unified YAML configuration for the mapping search.
//!
//! One file configures the driver, the mapping adapter, the congestion
//! grid, and run output paths.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// MCTS driver settings.
    pub search: SearchConfig,
    /// Congestion grid settings.
    #[serde(default)]
    pub grid: GridConfig,
    /// Mapping adapter settings.
    #[serde(default)]
    pub mapping: MappingConfig,
    /// Run output settings.
    #[serde(default)]
    pub run: RunConfig,
}

/// MCTS driver configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SearchConfig {
    /// PUCT exploration constant (scales child priors).
    pub puct: f64,
    /// Backpropagation decay: `father.q = max(father.q, lambda * (q + r))`.
    pub lambda: f64,
    /// Number of rollouts per run.
    pub iterations: u32,
    /// Depth bound per rollout.
    pub depth_limit: u32,
    /// Seed for prior noise. Two runs with the same seed and a
    /// deterministic adapter build identical trees.
    #[serde(default)]
    pub seed: u64,
}

/// Congestion grid configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GridConfig {
    /// Assumed routed wire width, in placement units.
    #[serde(default = "default_wire_width")]
    pub wire_width: i64,
    /// Tile edge length, in placement units.
    #[serde(default = "default_tile_size")]
    pub tile_size: i64,
}

fn default_wire_width() -> i64 {
    12
}

fn default_tile_size() -> i64 {
    50
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            wire_width: default_wire_width(),
            tile_size: default_tile_size(),
        }
    }
}

/// Reward returned to the driver by `take_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStrategy {
    /// Single-objective: delay.
    Delay,
    /// Combined: delay * area.
    DelayArea,
}

/// Mapping adapter configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Committed-node fraction at which a step is terminal.
    #[serde(default = "default_terminal_ratio")]
    pub terminal_ratio: f64,
    /// Fraction of a queue extracted per action.
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,
    #[serde(default = "default_strategy")]
    pub strategy: RewardStrategy,
    /// Arrival-time fixpoint cap; exceeding it is a hard error.
    #[serde(default = "default_max_match_iters")]
    pub max_match_iters: u32,
}

fn default_terminal_ratio() -> f64 {
    0.6
}

fn default_top_fraction() -> f64 {
    0.1
}

fn default_strategy() -> RewardStrategy {
    RewardStrategy::Delay
}

fn default_max_match_iters() -> u32 {
    16
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            terminal_ratio: default_terminal_ratio(),
            top_fraction: default_top_fraction(),
            strategy: default_strategy(),
            max_match_iters: default_max_match_iters(),
        }
    }
}

/// Run output configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunConfig {
    /// Directory for recorded result netlists.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    /// Scratch netlist path handed to the oracle (overwritten each step).
    #[serde(default = "default_scratch")]
    pub scratch_netlist: String,
    /// Cell library path handed to the oracle.
    #[serde(default)]
    pub library: String,
    /// External oracle command. If unset, callers supply their own oracle.
    #[serde(default)]
    pub oracle_cmd: Option<String>,
    /// NDJSON event log path.
    #[serde(default)]
    pub log_path: Option<String>,
}

fn default_out_dir() -> String {
    "out".to_string()
}

fn default_scratch() -> String {
    "out/scratch.netlist".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                puct: 5.0,
                lambda: 0.4,
                iterations: 50,
                depth_limit: 10,
                seed: 0,
            },
            grid: GridConfig::default(),
            mapping: MappingConfig::default(),
            run: RunConfig {
                out_dir: default_out_dir(),
                scratch_netlist: default_scratch(),
                library: String::new(),
                oracle_cmd: None,
                log_path: None,
            },
        }
    }
}
