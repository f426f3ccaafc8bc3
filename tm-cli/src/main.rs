//! tm: CLI binary for the mapping search.
//!
//! Subcommands:
//! - search: run the MCTS mapping search on a synthetic network

use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tm_core::config::Config;
use tm_core::geom::Point;
use tm_core::network::Network;
use tm_map::stubs::{CountingOracle, StubGenerator};
use tm_map::{AdapterPaths, MapAdapter, TimingOracle};
use tm_mcts::{Mcts, MctsConfig, RolloutStat};

mod oracle;
mod synth;

struct RunSummary {
    rollouts: u32,
    steps: u64,
    node_count: usize,
    baseline: f64,
    best_reward: f64,
    best_mul_reward: f64,
    repair_failures: u64,
    dropped_events: u64,
    per_rollout: Vec<RolloutStat>,
}

fn run_search<O: TimingOracle>(
    cfg: &Config,
    network: &Network,
    placement: &[Point],
    oracle: O,
) -> Result<RunSummary, Box<dyn Error>> {
    let paths = AdapterPaths {
        library: PathBuf::from(&cfg.run.library),
        scratch: PathBuf::from(&cfg.run.scratch_netlist),
        out_dir: PathBuf::from(&cfg.run.out_dir),
    };

    let mut adapter = MapAdapter::new(
        network,
        placement,
        StubGenerator::from_network(network),
        oracle,
        cfg.grid,
        cfg.mapping,
        paths,
    )?;

    if let Some(log_path) = &cfg.run.log_path {
        if let Some(dir) = Path::new(log_path).parent() {
            fs::create_dir_all(dir)?;
        }
        let w = tm_logging::NdjsonWriter::open_append(log_path)?;
        adapter = adapter.with_log(w);
    }

    let mcts_cfg = MctsConfig {
        puct: cfg.search.puct,
        lambda: cfg.search.lambda,
        iterations: cfg.search.iterations,
        depth_limit: cfg.search.depth_limit,
        seed: cfg.search.seed,
    };
    let mut mcts = Mcts::new(mcts_cfg, adapter)?;
    mcts.run()?;

    let stats = mcts.stats();
    Ok(RunSummary {
        rollouts: stats.rollouts,
        steps: stats.steps,
        node_count: stats.node_count,
        baseline: mcts.baseline(),
        best_reward: mcts.best_reward(),
        best_mul_reward: mcts.best_mul_reward(),
        repair_failures: mcts.adapter().repair_failures(),
        dropped_events: mcts.adapter().dropped_events(),
        per_rollout: stats.per_rollout.clone(),
    })
}

fn cmd_search(args: &[String]) {
    let mut config_path: Option<String> = None;
    let mut nodes: usize = 64;
    let mut seed: Option<u64> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"tm search

USAGE:
    tm search --config cfg.yaml [--nodes N] [--seed S]

OPTIONS:
    --config PATH    Path to YAML config (required)
    --nodes N        Synthetic network size (default: 64)
    --seed S         Override the config's search seed
"#
                );
                return;
            }
            "--config" => {
                config_path = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            "--nodes" => {
                nodes = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("Invalid --nodes value");
                        process::exit(1);
                    });
                i += 2;
            }
            "--seed" => {
                seed = Some(args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or_else(
                    || {
                        eprintln!("Invalid --seed value");
                        process::exit(1);
                    },
                ));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `tm search`: {}", other);
                eprintln!("Run `tm search --help` for usage.");
                process::exit(1);
            }
        }
    }

    let config_path = config_path.unwrap_or_else(|| {
        eprintln!("Missing --config");
        process::exit(1);
    });
    let config_bytes = fs::read(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to read config file: {e}");
        process::exit(1);
    });
    let mut cfg = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}");
        process::exit(1);
    });
    if let Some(s) = seed {
        cfg.search.seed = s;
    }

    fs::create_dir_all(&cfg.run.out_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create output dir: {e}");
        process::exit(1);
    });

    let (network, placement) = synth::random_network(nodes, cfg.search.seed);

    // Run header goes out before the adapter starts appending step events.
    if let Some(log_path) = &cfg.run.log_path {
        if let Some(dir) = Path::new(log_path).parent() {
            let _ = fs::create_dir_all(dir);
        }
        let mut w = tm_logging::NdjsonWriter::open_append(log_path).unwrap_or_else(|e| {
            eprintln!("Failed to open event log: {e}");
            process::exit(1);
        });
        let header = tm_logging::RunHeaderV1::new(
            tm_logging::hash_config_bytes(&config_bytes),
            cfg.search.seed,
            network.len(),
            cfg.search.iterations,
        );
        w.write_event(&header).unwrap_or_else(|e| {
            eprintln!("Failed to write run header: {e}");
            process::exit(1);
        });
        let _ = w.flush();
    }

    println!("Running mapping search...");
    let result = match &cfg.run.oracle_cmd {
        Some(cmd) => run_search(&cfg, &network, &placement, oracle::ExternalOracle::new(cmd)),
        None => run_search(&cfg, &network, &placement, CountingOracle),
    };
    let summary = result.unwrap_or_else(|e| {
        eprintln!("Search failed: {e}");
        process::exit(1);
    });

    if let Some(log_path) = &cfg.run.log_path {
        let mut w = tm_logging::NdjsonWriter::open_append(log_path).unwrap_or_else(|e| {
            eprintln!("Failed to open event log: {e}");
            process::exit(1);
        });
        for (idx, r) in summary.per_rollout.iter().enumerate() {
            let _ = w.write_event(&tm_logging::RolloutEventV1 {
                event: "rollout",
                ts_ms: tm_logging::now_ms(),
                rollout: idx as u32,
                depth: r.depth,
                terminal: r.terminal,
                best_reward: summary.best_reward,
                best_mul_reward: summary.best_mul_reward,
            });
        }
        let _ = w.flush();
    }

    let terminal_rollouts = summary.per_rollout.iter().filter(|r| r.terminal).count();
    println!();
    println!("Search complete.");
    println!(
        "  - Network: {} nodes, seed {}",
        network.len(),
        cfg.search.seed
    );
    println!(
        "  - Rollouts: {} ({} terminal), steps: {}, tree: {} states",
        summary.rollouts, terminal_rollouts, summary.steps, summary.node_count
    );
    println!("  - Baseline reward: {:.4}", summary.baseline);
    println!("  - Best delay reward: {:.4}", summary.best_reward);
    println!("  - Best delay*area reward: {:.4}", summary.best_mul_reward);
    if summary.repair_failures > 0 {
        println!("  - Repair failures: {}", summary.repair_failures);
    }
    if summary.dropped_events > 0 {
        println!("  - Dropped log events: {}", summary.dropped_events);
    }
    println!("  - Results under {}", cfg.run.out_dir);
}

fn print_help() {
    eprintln!(
        r#"tm - MCTS technology-mapping search CLI

USAGE:
    tm <COMMAND> [OPTIONS]

COMMANDS:
    search              Run the mapping search on a synthetic network

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `tm <COMMAND> --help` for command usage.
"#
    );
}

fn print_version() {
    println!("tm {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(0);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "-V" | "--version" => {
            print_version();
        }
        "search" => {
            cmd_search(&args[2..]);
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Run `tm --help` for usage.");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_core::config::Config;

    #[test]
    fn smoke_run_on_a_synthetic_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.search.iterations = 5;
        cfg.search.depth_limit = 6;
        cfg.search.seed = 11;
        cfg.mapping.top_fraction = 0.5;
        cfg.run.out_dir = dir.path().join("out").to_string_lossy().into_owned();
        cfg.run.scratch_netlist = dir
            .path()
            .join("out/scratch.netlist")
            .to_string_lossy()
            .into_owned();
        cfg.run.log_path = Some(
            dir.path()
                .join("out/events.ndjson")
                .to_string_lossy()
                .into_owned(),
        );

        let (network, placement) = synth::random_network(24, cfg.search.seed);
        let summary = run_search(&cfg, &network, &placement, CountingOracle).unwrap();

        assert_eq!(summary.rollouts, 5);
        assert!(summary.baseline > 0.0);
        assert!(summary.best_reward <= summary.baseline);
        assert_eq!(summary.per_rollout.len(), 5);

        // The log parent did not exist beforehand; run_search creates it
        // and the adapter appends one event per step.
        let log = std::fs::read_to_string(dir.path().join("out/events.ndjson")).unwrap();
        assert!(log.lines().any(|l| l.contains("\"event\":\"step\"")));
    }

    #[test]
    fn invalid_search_config_is_an_error_not_an_exit() {
        let mut cfg = Config::default();
        cfg.search.iterations = 0;
        let (network, placement) = synth::random_network(16, 3);
        assert!(run_search(&cfg, &network, &placement, CountingOracle).is_err());
    }
}
