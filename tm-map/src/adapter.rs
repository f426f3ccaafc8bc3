//! The mapping adapter: realizes one MCTS action as a concrete,
//! evaluable (possibly partial) mapped netlist.
//!
//! External collaborators stay behind traits: the candidate generator
//! performs library matching, the timing oracle performs STA. This module
//! only schedules commitments, legalizes, and scores.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tm_core::candidate::{Candidate, Metric, ACTIONS, PHASES};
use tm_core::config::{GridConfig, MappingConfig, RewardStrategy};
use tm_core::geom::{Point, Rect};
use tm_core::match_table::MatchTable;
use tm_core::network::{Network, NodeIndex};
use tm_logging::{now_ms, NdjsonWriter, StepEventV1};
use tm_mcts::SearchAdapter;
use tm_rudy::{Grid, GridError};

use crate::queues::CandidateQueues;

/// One scored implementation choice returned by the library matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub cut: u32,
    pub supergate: u32,
    /// Gate area cost (positive).
    pub area: f64,
    /// Per-leaf pin delay, same length as `leaves`.
    pub pin_delays: Vec<f64>,
    /// Cut leaves, each a network node feeding this implementation.
    pub leaves: Vec<NodeIndex>,
}

/// Library matching, abstracted. This core never enumerates cuts itself.
pub trait CandidateGenerator {
    /// All scored candidates for one polarity phase of one node.
    fn matches(&self, node: NodeIndex, phase: u8) -> Vec<ScoredMatch>;

    /// Minimal-library implementation (AND/NAND/INV-class) used by the
    /// restricted legalization pass. `None` means the library cannot
    /// cover the node at all.
    fn base_match(&self, node: NodeIndex, phase: u8) -> Option<ScoredMatch>;
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("oracle output malformed: {0}")]
    Malformed(String),
    #[error("oracle exited with status {0}")]
    Failed(i32),
}

/// Blocking external timing/area oracle.
pub trait TimingOracle {
    /// Evaluate the netlist at `netlist` against `library`, returning
    /// `(delay, area)`.
    fn evaluate(&mut self, library: &Path, netlist: &Path) -> Result<(f64, f64), OracleError>;
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("action index {0} out of range")]
    ActionOutOfRange(usize),
    #[error("matching pass failed to converge after {0} iterations")]
    MatchDiverged(u32),
    #[error("library cannot cover node {0}")]
    Uncoverable(NodeIndex),
    #[error("congestion grid: {0}")]
    Grid(#[from] GridError),
    #[error("timing oracle failed: {0}")]
    Oracle(#[from] OracleError),
    #[error("scratch netlist write failed: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Filesystem surface of a run.
#[derive(Debug, Clone)]
pub struct AdapterPaths {
    /// Cell library handed to the oracle.
    pub library: PathBuf,
    /// Scratch netlist, overwritten once per `take_action`.
    pub scratch: PathBuf,
    /// Directory for recorded result netlists.
    pub out_dir: PathBuf,
}

/// One gate of a materialized netlist.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundGate {
    pub node: NodeIndex,
    pub phase: u8,
    pub cut: u32,
    pub supergate: u32,
    /// Physical position, the centroid of the matched leaves' placement.
    pub x: i64,
    pub y: i64,
    pub leaves: Vec<NodeIndex>,
}

/// The MCTS "implement": commits candidate slices, keeps the netlist
/// evaluable, and feeds rewards back to the driver.
pub struct MapAdapter<'a, G: CandidateGenerator, O: TimingOracle> {
    network: &'a Network,
    placement: &'a [Point],
    generator: G,
    oracle: O,
    cfg: MappingConfig,
    strategy: RewardStrategy,
    paths: AdapterPaths,
    grid: Grid,
    table: MatchTable,
    queues: CandidateQueues,
    arrivals_fresh: bool,
    reward: f64,
    mul_reward: f64,
    terminal: bool,
    evaluated: bool,
    bound: Vec<BoundGate>,
    log: Option<NdjsonWriter>,
    dropped_events: u64,
    repair_failures: u64,
    record_failures: u64,
}

impl<'a, G: CandidateGenerator, O: TimingOracle> MapAdapter<'a, G, O> {
    pub fn new(
        network: &'a Network,
        placement: &'a [Point],
        generator: G,
        oracle: O,
        grid_cfg: GridConfig,
        cfg: MappingConfig,
        paths: AdapterPaths,
    ) -> Result<Self, MapError> {
        let grid = Grid::build(placement, network, grid_cfg.wire_width, grid_cfg.tile_size)?;
        let strategy = cfg.strategy;
        Ok(Self {
            network,
            placement,
            generator,
            oracle,
            cfg,
            strategy,
            paths,
            grid,
            table: MatchTable::new(network.len()),
            queues: CandidateQueues::default(),
            arrivals_fresh: false,
            reward: 0.0,
            mul_reward: 0.0,
            terminal: false,
            evaluated: false,
            bound: Vec::new(),
            log: None,
            dropped_events: 0,
            repair_failures: 0,
            record_failures: 0,
        })
    }

    /// Attach an NDJSON step-event writer. Logging is best-effort; write
    /// failures are counted, not propagated.
    pub fn with_log(mut self, log: NdjsonWriter) -> Self {
        self.log = Some(log);
        self
    }

    pub fn table(&self) -> &MatchTable {
        &self.table
    }

    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn queue_len(&self, metric: Metric) -> usize {
        self.queues.len(metric)
    }

    pub fn bound_gates(&self) -> &[BoundGate] {
        &self.bound
    }

    pub fn repair_failures(&self) -> u64 {
        self.repair_failures
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    fn committed_fraction(&self) -> f64 {
        if self.network.is_empty() {
            return 0.0;
        }
        self.table.committed_nodes() as f64 / self.network.len() as f64
    }

    fn update_terminal(&mut self) {
        self.terminal = self.committed_fraction() > self.cfg.terminal_ratio;
    }

    fn strategy_reward(&self) -> f64 {
        match self.strategy {
            RewardStrategy::Delay => self.reward,
            RewardStrategy::DelayArea => self.mul_reward,
        }
    }

    /// Delay-oriented arrival-time fixpoint. Does not depend on
    /// accumulated commitments, so a fresh result can be reused across
    /// steps within one rollout.
    fn arrival_pass(&mut self) -> Result<(), MapError> {
        if self.arrivals_fresh {
            return Ok(());
        }
        for node in 0..self.network.len() {
            let row = self.table.get_mut(node);
            row.arrival = if self.network.is_input(node) {
                [0.0; PHASES]
            } else {
                [f64::INFINITY; PHASES]
            };
        }

        let mut iters = 0u32;
        loop {
            let mut changed = false;
            for &node in self.network.topo_order() {
                if self.network.is_input(node) {
                    continue;
                }
                for phase in 0..PHASES as u8 {
                    let mut best = f64::INFINITY;
                    for m in self.generator.matches(node, phase) {
                        let arr = self.match_arrival(&m, phase);
                        if arr < best {
                            best = arr;
                        }
                    }
                    let slot = &mut self.table.get_mut(node).arrival[phase as usize];
                    if best < *slot {
                        *slot = best;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
            iters += 1;
            if iters > self.cfg.max_match_iters {
                return Err(MapError::MatchDiverged(self.cfg.max_match_iters));
            }
        }

        for node in 0..self.network.len() {
            if !self.network.is_input(node)
                && self.table.get(node).arrival[0].is_infinite()
            {
                return Err(MapError::Uncoverable(node));
            }
        }
        self.arrivals_fresh = true;
        Ok(())
    }

    fn match_arrival(&self, m: &ScoredMatch, phase: u8) -> f64 {
        let mut worst = 0.0f64;
        for (i, &leaf) in m.leaves.iter().enumerate() {
            let pd = m.pin_delays.get(i).copied().unwrap_or(0.0);
            let arr = self.table.get(leaf).arrival[phase as usize] + pd;
            if arr > worst {
                worst = arr;
            }
        }
        worst
    }

    /// Score every candidate under all four objectives and rebuild the
    /// queues. The wirelength objectives consult the congestion grid
    /// through a speculative what-if per candidate.
    fn score_candidates(&mut self) -> Result<(), MapError> {
        self.arrival_pass()?;

        let mut candidates = Vec::new();
        for &node in self.network.topo_order() {
            if self.network.is_input(node) {
                continue;
            }
            // The node's driven net contributes to the total-wirelength
            // objective for every candidate of this node.
            let net_pins = self.pins_of(&self.network.net(node));
            let fanout_cost = self.net_cost(&net_pins)?;

            for phase in 0..PHASES as u8 {
                for m in self.generator.matches(node, phase) {
                    let mut pins = self.pins_of(&m.leaves);
                    pins.push(self.placement[node]);
                    let wire_cost = self.net_cost(&pins)?;

                    candidates.push(Candidate {
                        node,
                        phase,
                        cut: m.cut,
                        supergate: m.supergate,
                        area: -m.area,
                        delay: -self.match_arrival(&m, phase),
                        wirelength: -wire_cost,
                        total_wirelength: -(wire_cost + fanout_cost),
                    });
                }
            }
        }
        self.queues = CandidateQueues::build(&candidates);
        Ok(())
    }

    fn pins_of(&self, nodes: &[NodeIndex]) -> Vec<Point> {
        nodes.iter().map(|&n| self.placement[n]).collect()
    }

    /// Congestion-adjusted cost of one prospective net: its HPWL plus the
    /// grid's what-if congestion signal over its bounding box.
    fn net_cost(&mut self, pins: &[Point]) -> Result<f64, MapError> {
        let Some(bbox) = Rect::bounding(pins) else {
            return Ok(0.0);
        };
        if bbox.hpwl() == 0 {
            return Ok(0.0);
        }
        self.grid.begin_speculative()?;
        self.grid.add_net_speculative(pins)?;
        let congest = self
            .grid
            .hpwl_congest(bbox.xlo(), bbox.ylo(), bbox.xhi(), bbox.yhi());
        self.grid.rollback()?;
        Ok(bbox.hpwl() as f64 + congest)
    }

    /// Resolve the implementation legalization will bind for `node`:
    /// the committed match if the lock is set, otherwise the minimal-gate
    /// fallback.
    fn resolve_binding(&self, node: NodeIndex, phase: u8) -> Result<ScoredMatch, MapError> {
        let pm = self.table.get(node).phases[phase as usize];
        if pm.set {
            if let Some(m) = self
                .generator
                .matches(node, phase)
                .into_iter()
                .find(|m| m.cut == pm.cut && m.supergate == pm.supergate)
            {
                return Ok(m);
            }
            debug_assert!(false, "committed match vanished from generator");
        }
        self.generator
            .base_match(node, phase)
            .ok_or(MapError::Uncoverable(node))
    }

    /// Phase materialization binds: a locked phase if any (positive phase
    /// preferred when both are locked), otherwise the positive phase from
    /// the minimal gate set.
    fn binding_phase(&self, node: NodeIndex) -> u8 {
        let phases = &self.table.get(node).phases;
        if !phases[0].set && phases[1].set {
            return 1;
        }
        0
    }

    /// Restricted legalization: bind every non-input node, committed ones
    /// from their locked match and the rest from the minimal gate set.
    /// Builds into a fresh list, so a failure leaves prior state intact.
    fn legalize(&mut self) -> Result<(), MapError> {
        let mut bound = Vec::with_capacity(self.network.len());
        for &node in self.network.topo_order() {
            if self.network.is_input(node) {
                continue;
            }
            let phase = self.binding_phase(node);
            let m = self.resolve_binding(node, phase)?;
            let (x, y) = self.gate_position(node, &m.leaves);
            bound.push(BoundGate {
                node,
                phase,
                cut: m.cut,
                supergate: m.supergate,
                x,
                y,
                leaves: m.leaves,
            });
        }
        self.bound = bound;
        Ok(())
    }

    fn gate_position(&self, node: NodeIndex, leaves: &[NodeIndex]) -> (i64, i64) {
        if leaves.is_empty() {
            let p = self.placement[node];
            return (p.x, p.y);
        }
        let (mut sx, mut sy) = (0i64, 0i64);
        for &l in leaves {
            let p = self.placement[l];
            sx += p.x;
            sy += p.y;
        }
        (sx / leaves.len() as i64, sy / leaves.len() as i64)
    }

    /// Exact-area repair: recompute required times from the critical
    /// output, then re-optimize committed nodes for area within slack.
    fn repair(&mut self) -> Result<(), MapError> {
        self.arrival_pass()?;

        let mut critical = 0.0f64;
        for out in self.network.outputs() {
            let arr = self.table.get(out).arrival[0];
            if !arr.is_finite() {
                return Err(MapError::Uncoverable(out));
            }
            critical = critical.max(arr);
        }

        for node in 0..self.network.len() {
            self.table.get_mut(node).required = [f64::INFINITY; PHASES];
        }
        for out in self.network.outputs() {
            self.table.get_mut(out).required[0] = critical;
        }
        for &node in self.network.topo_order().iter().rev() {
            if self.network.is_input(node) {
                continue;
            }
            let req = self.table.get(node).required[0];
            if !req.is_finite() {
                continue;
            }
            let m = self.resolve_binding(node, 0)?;
            for (i, &leaf) in m.leaves.iter().enumerate() {
                let pd = m.pin_delays.get(i).copied().unwrap_or(0.0);
                let slot = &mut self.table.get_mut(leaf).required[0];
                *slot = slot.min(req - pd);
            }
        }

        // Swap committed supergates toward area wherever slack allows.
        for &node in self.network.topo_order() {
            let row = self.table.get(node);
            if !row.phases[0].set || !row.required[0].is_finite() {
                continue;
            }
            let budget = row.required[0];
            let current_area = row.phases[0].area;
            let mut best: Option<ScoredMatch> = None;
            for m in self.generator.matches(node, 0) {
                if self.match_arrival(&m, 0) <= budget
                    && m.area < best.as_ref().map_or(current_area, |b| b.area)
                {
                    best = Some(m);
                }
            }
            if let Some(m) = best {
                let slot = &mut self.table.get_mut(node).phases[0];
                slot.cut = m.cut;
                slot.supergate = m.supergate;
                slot.area = m.area;
            }
        }
        Ok(())
    }

    /// Write the bound netlist to the scratch path and ask the oracle for
    /// `(delay, area)`.
    fn evaluate(&mut self) -> Result<(f64, f64), MapError> {
        if let Some(dir) = self.paths.scratch.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut buf = Vec::new();
        self.render_netlist(&mut buf)?;
        fs::write(&self.paths.scratch, &buf)?;

        let (delay, area) = self
            .oracle
            .evaluate(&self.paths.library, &self.paths.scratch)?;
        Ok((delay, area))
    }

    fn render_netlist(&self, w: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            w,
            "netlist v1 nodes={} gates={}",
            self.network.len(),
            self.bound.len()
        )?;
        for g in &self.bound {
            write!(
                w,
                "gate {} {} {} {} {} {}",
                g.node, g.phase, g.cut, g.supergate, g.x, g.y
            )?;
            for &l in &g.leaves {
                write!(w, " {l}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    fn log_step(&mut self, event: StepEventV1) {
        if let Some(log) = self.log.as_mut() {
            if log.write_event(&event).is_err() {
                self.dropped_events += 1;
            }
        }
    }

    fn persist(&mut self, name: &str) {
        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&self.paths.out_dir)?;
            let mut buf = Vec::new();
            self.render_netlist(&mut buf)?;
            fs::write(self.paths.out_dir.join(format!("{name}.netlist")), &buf)
        };
        if write().is_err() {
            self.record_failures += 1;
        }
    }
}

impl<G: CandidateGenerator, O: TimingOracle> SearchAdapter for MapAdapter<'_, G, O> {
    type Error = MapError;

    fn action_count(&self) -> usize {
        ACTIONS
    }

    fn initialize(&mut self) -> Result<f64, MapError> {
        self.grid.calculate_rudy();
        self.score_candidates()?;
        // Baseline: the trivial minimal-gate mapping of the whole network.
        self.legalize()?;
        let (delay, area) = self.evaluate()?;
        self.reward = delay;
        self.mul_reward = delay * area;
        self.evaluated = true;
        self.update_terminal();
        Ok(self.strategy_reward())
    }

    fn reinit(&mut self) -> Result<(), MapError> {
        self.table.reinit();
        self.arrivals_fresh = false;
        self.terminal = false;
        self.score_candidates()
    }

    fn terminal(&mut self) -> bool {
        if !self.evaluated {
            self.update_terminal();
        }
        self.terminal
    }

    fn take_action(&mut self, action: usize, depth: u32) -> Result<f64, MapError> {
        let metric = Metric::from_index(action).ok_or(MapError::ActionOutOfRange(action))?;

        // 1. Delay-oriented pass; skipped when still fresh this rollout.
        self.arrival_pass()?;

        // 2-3. Extract the metric's tail slice and commit, first writer
        // wins in queue-tail order.
        let batch = self.queues.take_top_percent(metric, self.cfg.top_fraction);
        let mut committed = 0usize;
        for c in &batch {
            // Gains are negated back into positive costs for bookkeeping.
            if self
                .table
                .try_commit(c.node, c.phase, c.cut, c.supergate, -c.area, -c.wirelength)
            {
                committed += 1;
            }
        }

        // 4. Terminal check against the committed fraction.
        self.update_terminal();

        // 5. Restricted legalization keeps the netlist evaluable.
        self.legalize()?;

        // 6. Area repair once enough of the network is locked in;
        // failure is non-fatal.
        if self.committed_fraction() >= self.cfg.terminal_ratio {
            if self.repair().is_err() {
                self.repair_failures += 1;
            }
            // Repair may have swapped committed matches; rebind.
            self.legalize()?;
        }

        // 7. Materialize and consult the oracle.
        let (delay, area) = self.evaluate()?;
        self.reward = delay;
        self.mul_reward = delay * area;
        self.evaluated = true;

        // 8. Reward per configured strategy.
        let reward = self.strategy_reward();
        self.log_step(StepEventV1 {
            event: "step",
            ts_ms: now_ms(),
            action,
            depth,
            extracted: batch.len(),
            committed,
            committed_nodes: self.table.committed_nodes(),
            delay,
            area,
            reward,
        });
        Ok(reward)
    }

    fn reward(&self) -> f64 {
        self.reward
    }

    fn mul_reward(&self) -> f64 {
        self.mul_reward
    }

    fn record_result(&mut self, name: &str) {
        self.persist(name);
    }

    fn record_best(&mut self) {
        self.persist("best");
    }

    fn record_mul_best(&mut self) {
        self.persist("best_delay_area");
    }
}
