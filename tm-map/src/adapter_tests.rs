use std::fs;

use tempfile::{tempdir, TempDir};
use tm_core::candidate::Metric;
use tm_core::config::{GridConfig, MappingConfig, RewardStrategy};
use tm_core::geom::Point;
use tm_core::network::Network;
use tm_mcts::{Mcts, MctsConfig, SearchAdapter};

use crate::adapter::{AdapterPaths, MapAdapter, MapError};
use crate::stubs::{CountingOracle, StubGenerator};

fn diamond() -> Network {
    // 0,1 inputs; 2 = f(0,1); 3 = f(0,2); 4 = f(2,3)
    Network::new(vec![vec![], vec![], vec![0, 1], vec![0, 2], vec![2, 3]]).unwrap()
}

fn placement() -> Vec<Point> {
    vec![
        Point { x: 0, y: 0 },
        Point { x: 100, y: 0 },
        Point { x: 50, y: 50 },
        Point { x: 0, y: 100 },
        Point { x: 100, y: 100 },
    ]
}

fn paths(dir: &TempDir) -> AdapterPaths {
    AdapterPaths {
        library: dir.path().join("lib.txt"),
        scratch: dir.path().join("scratch.netlist"),
        out_dir: dir.path().join("out"),
    }
}

fn mapping(top_fraction: f64, terminal_ratio: f64, strategy: RewardStrategy) -> MappingConfig {
    MappingConfig {
        terminal_ratio,
        top_fraction,
        strategy,
        max_match_iters: 16,
    }
}

fn adapter<'a>(
    network: &'a Network,
    placement: &'a [Point],
    dir: &TempDir,
    cfg: MappingConfig,
) -> MapAdapter<'a, StubGenerator, CountingOracle> {
    MapAdapter::new(
        network,
        placement,
        StubGenerator::from_network(network),
        CountingOracle,
        GridConfig::default(),
        cfg,
        paths(dir),
    )
    .unwrap()
}

#[test]
fn initialize_scores_and_evaluates_the_fallback_mapping() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(0.1, 0.6, RewardStrategy::Delay);
    let mut a = adapter(&network, &placement, &dir, cfg);

    let baseline = a.initialize().unwrap();
    // Three gates of supergate 9: delay 1 + 0.05 * 27, area 1 + 0.5 * 3.
    assert!((baseline - 2.35).abs() < 1e-9);
    assert!((a.mul_reward() - 2.35 * 2.5).abs() < 1e-9);

    // 3 non-input nodes, 2 phases, 2 library matches each.
    for m in Metric::ALL {
        assert_eq!(a.queue_len(m), 12);
    }
    assert_eq!(a.bound_gates().len(), 3);
    assert!(!a.terminal());
}

#[test]
fn combined_strategy_returns_the_product_baseline() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(0.1, 0.6, RewardStrategy::DelayArea);
    let mut a = adapter(&network, &placement, &dir, cfg);

    let baseline = a.initialize().unwrap();
    assert!((baseline - 2.35 * 2.5).abs() < 1e-9);
    assert_eq!(baseline, a.mul_reward());
}

#[test]
fn action_out_of_range_is_rejected() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(0.1, 0.6, RewardStrategy::Delay);
    let mut a = adapter(&network, &placement, &dir, cfg);
    a.initialize().unwrap();

    assert!(matches!(
        a.take_action(7, 0),
        Err(MapError::ActionOutOfRange(7))
    ));
}

#[test]
fn full_extraction_commits_the_small_supergate_everywhere() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(1.0, 0.5, RewardStrategy::Delay);
    let mut a = adapter(&network, &placement, &dir, cfg);
    let baseline = a.initialize().unwrap();

    // Area action: supergate 1 (area 1.0) has the best gain per node and
    // phase, so it wins the lock everywhere.
    let reward = a.take_action(Metric::Area.index(), 0).unwrap();
    for node in [2usize, 3, 4] {
        for phase in 0..2 {
            let pm = a.table().get(node).phases[phase];
            assert!(pm.set, "node {node} phase {phase} not committed");
            assert_eq!(pm.supergate, 1);
            assert!((pm.area - 1.0).abs() < 1e-9);
        }
    }
    // Three gates of supergate 1: delay 1 + 0.05 * 3.
    assert!((reward - 1.15).abs() < 1e-9);
    assert!(reward < baseline);
    // 3 of 5 nodes committed, past the 0.5 terminal ratio.
    assert!(a.terminal());
    assert_eq!(a.queue_len(Metric::Area), 0);
    assert_eq!(a.queue_len(Metric::Delay), 12);
}

#[test]
fn committed_negative_phase_reaches_the_evaluated_netlist() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();

    // One standout area candidate on node 2's negative phase; with 13
    // queue entries and fraction 0.1 it is the only extraction.
    let mut generator = StubGenerator::from_network(&network);
    generator.add_match(
        2,
        1,
        crate::adapter::ScoredMatch {
            cut: 1,
            supergate: 5,
            area: 0.5,
            pin_delays: vec![1.5; 2],
            leaves: vec![0, 1],
        },
    );
    let mut a = MapAdapter::new(
        &network,
        &placement,
        generator,
        CountingOracle,
        GridConfig::default(),
        mapping(0.1, 0.9, RewardStrategy::Delay),
        paths(&dir),
    )
    .unwrap();
    a.initialize().unwrap();

    let reward = a.take_action(Metric::Area.index(), 0).unwrap();

    let row = a.table().get(2);
    assert!(!row.phases[0].set);
    assert!(row.phases[1].set);

    // The lone phase-1 commitment must be bound, not shadowed by the
    // phase-0 fallback.
    let gate = a.bound_gates().iter().find(|g| g.node == 2).unwrap();
    assert_eq!((gate.phase, gate.supergate), (1, 5));
    // Supergates 5 + 9 + 9: delay 1 + 0.05 * 23.
    assert!((reward - 2.15).abs() < 1e-9);
}

#[test]
fn uncoverable_node_fails_without_touching_its_row() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    // Nothing gets extracted, so legalization must fall back to the
    // minimal library for every node.
    let cfg = mapping(0.0, 0.6, RewardStrategy::Delay);
    let mut a = adapter(&network, &placement, &dir, cfg);
    a.initialize().unwrap();

    a.generator_mut().remove_base(4, 0);
    let before = a.table().get(4).clone();
    assert!(matches!(a.take_action(0, 0), Err(MapError::Uncoverable(4))));
    assert_eq!(*a.table().get(4), before);
}

#[test]
fn reinit_releases_locks_and_rebuilds_queues() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(1.0, 0.5, RewardStrategy::Delay);
    let mut a = adapter(&network, &placement, &dir, cfg);
    a.initialize().unwrap();
    a.take_action(Metric::Area.index(), 0).unwrap();
    assert!(a.terminal());

    a.reinit().unwrap();
    assert!(!a.terminal());
    assert_eq!(a.table().committed_nodes(), 0);
    for m in Metric::ALL {
        assert_eq!(a.queue_len(m), 12);
    }
}

#[test]
fn record_result_persists_a_named_netlist() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(0.1, 0.6, RewardStrategy::Delay);
    let mut a = adapter(&network, &placement, &dir, cfg);
    a.initialize().unwrap();

    a.record_result("trial");
    let text = fs::read_to_string(dir.path().join("out").join("trial.netlist")).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(header, "netlist v1 nodes=5 gates=3");
    assert_eq!(text.lines().filter(|l| l.starts_with("gate ")).count(), 3);
}

#[test]
fn driver_search_beats_the_fallback_baseline() {
    let network = diamond();
    let placement = placement();
    let dir = tempdir().unwrap();
    let cfg = mapping(1.0, 0.5, RewardStrategy::Delay);
    let a = adapter(&network, &placement, &dir, cfg);

    let mcts_cfg = MctsConfig {
        puct: 1.0,
        lambda: 0.4,
        iterations: 4,
        depth_limit: 4,
        seed: 7,
    };
    let mut mcts = Mcts::new(mcts_cfg, a).unwrap();
    mcts.run().unwrap();

    assert_eq!(mcts.stats().rollouts, 4);
    // Any full extraction commits real library matches, all cheaper than
    // the supergate-9 fallback.
    assert!(mcts.best_reward() < mcts.baseline());
    assert!(dir.path().join("out").join("best.netlist").exists());

    let a = mcts.into_adapter();
    assert_eq!(a.repair_failures(), 0);
    assert_eq!(a.dropped_events(), 0);
}
