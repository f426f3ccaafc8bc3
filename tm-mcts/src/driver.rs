//! The search driver: selection, expansion, backpropagation.

use crate::arena::Arena;
use crate::state::{PathKey, State, StateId};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use rand_distr::StandardNormal;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// The adapter realizes one MCTS action as an evaluable result and returns
/// a scalar reward. Rewards are minimized.
pub trait SearchAdapter {
    type Error: std::error::Error;

    /// Fixed action space size; the arity of every expanded state.
    fn action_count(&self) -> usize;

    /// Build initial state and return the baseline reward used as the
    /// driver's normalization denominator.
    fn initialize(&mut self) -> Result<f64, Self::Error>;

    /// Reset per-rollout state. Called before every rollout after the
    /// first.
    fn reinit(&mut self) -> Result<(), Self::Error>;

    /// Whether the current partial result is complete enough to stop.
    fn terminal(&mut self) -> bool;

    /// Realize `action` at rollout depth `depth` and return the reward.
    fn take_action(&mut self, action: usize, depth: u32) -> Result<f64, Self::Error>;

    /// Last computed reward.
    fn reward(&self) -> f64;

    /// Last computed combined (delay * area) reward.
    fn mul_reward(&self) -> f64;

    /// Persist the current result under a caller-chosen name.
    fn record_result(&mut self, name: &str);

    /// Persist the current result as the best single-objective result.
    fn record_best(&mut self);

    /// Persist the current result as the best combined result.
    fn record_mul_best(&mut self);
}

#[derive(Debug, Clone, Copy)]
pub struct MctsConfig {
    /// PUCT constant scaling child priors.
    pub puct: f64,
    /// Backpropagation decay.
    pub lambda: f64,
    /// Rollouts per `run`.
    pub iterations: u32,
    /// Depth bound per rollout.
    pub depth_limit: u32,
    /// Prior-noise seed.
    pub seed: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            puct: 5.0,
            lambda: 0.4,
            iterations: 50,
            depth_limit: 10,
            seed: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum MctsError<E: std::error::Error> {
    #[error("invalid config: {msg}")]
    InvalidConfig { msg: &'static str },
    #[error("baseline reward {0} is not a positive finite number")]
    BadBaseline(f64),
    #[error("adapter failure: {0}")]
    Adapter(#[source] E),
}

/// Per-rollout accounting.
#[derive(Debug, Clone, Copy)]
pub struct RolloutStat {
    pub depth: u32,
    pub terminal: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub rollouts: u32,
    pub steps: u64,
    pub expansions: u64,
    pub node_count: usize,
    pub per_rollout: Vec<RolloutStat>,
}

/// Single-threaded search driver, generic over the adapter.
pub struct Mcts<A: SearchAdapter> {
    cfg: MctsConfig,
    adapter: A,
    arena: Arena,
    root: StateId,
    positions: FxHashMap<PathKey, StateId>,
    rng: ChaCha8Rng,
    baseline: f64,
    best_reward: f64,
    best_mul_reward: f64,
    stats: SearchStats,
}

impl<A: SearchAdapter> Mcts<A> {
    pub fn new(cfg: MctsConfig, adapter: A) -> Result<Self, MctsError<A::Error>> {
        if !(cfg.puct.is_finite() && cfg.puct > 0.0) {
            return Err(MctsError::InvalidConfig {
                msg: "puct must be finite and > 0",
            });
        }
        if !(cfg.lambda.is_finite() && cfg.lambda > 0.0 && cfg.lambda <= 1.0) {
            return Err(MctsError::InvalidConfig {
                msg: "lambda must be in (0, 1]",
            });
        }
        if cfg.iterations == 0 {
            return Err(MctsError::InvalidConfig {
                msg: "iterations must be > 0",
            });
        }
        if cfg.depth_limit == 0 {
            return Err(MctsError::InvalidConfig {
                msg: "depth_limit must be > 0",
            });
        }
        if adapter.action_count() == 0 {
            return Err(MctsError::InvalidConfig {
                msg: "adapter action space must be non-empty",
            });
        }

        let mut arena = Arena::new();
        let mut positions = FxHashMap::default();
        // Root: visited by definition, no father, empty path.
        let root = arena.push(State::new(None, 0, 0.0, PathKey::new()));
        positions.insert(PathKey::new(), root);

        Ok(Self {
            cfg,
            adapter,
            arena,
            root,
            positions,
            rng: ChaCha8Rng::seed_from_u64(cfg.seed),
            baseline: f64::NAN,
            best_reward: f64::INFINITY,
            best_mul_reward: f64::INFINITY,
            stats: SearchStats::default(),
        })
    }

    pub fn root(&self) -> &State {
        self.arena.get(self.root)
    }

    pub fn state(&self, id: StateId) -> &State {
        self.arena.get(id)
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn best_reward(&self) -> f64 {
        self.best_reward
    }

    pub fn best_mul_reward(&self) -> f64 {
        self.best_mul_reward
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Perform `iterations` rollouts. Adapter failures abort the run;
    /// everything committed before the failure stays recorded in the
    /// adapter.
    pub fn run(&mut self) -> Result<(), MctsError<A::Error>> {
        let baseline = self.adapter.initialize().map_err(MctsError::Adapter)?;
        if !(baseline.is_finite() && baseline > 0.0) {
            return Err(MctsError::BadBaseline(baseline));
        }
        self.baseline = baseline;
        self.arena.get_mut(self.root).reward = baseline;
        self.arena.get_mut(self.root).mul_reward = self.adapter.mul_reward();
        self.expand(self.root);

        for it in 0..self.cfg.iterations {
            if it > 0 {
                self.adapter.reinit().map_err(MctsError::Adapter)?;
            }
            self.arena.get_mut(self.root).visited += 1;
            self.iter()?;
            self.stats.rollouts += 1;
        }
        Ok(())
    }

    /// Consume the driver, returning the adapter. The search must have
    /// reached a terminal mapping.
    pub fn into_adapter(mut self) -> A {
        assert!(
            self.adapter.terminal(),
            "search finished without reaching a terminal mapping"
        );
        self.adapter
    }

    /// One rollout: descend until terminal or the depth bound, then walk
    /// father links back to the root applying the max-update.
    fn iter(&mut self) -> Result<(), MctsError<A::Error>> {
        let mut cur = self.root;
        let mut depth = 0u32;
        while !self.arena.get(cur).terminal && depth < self.cfg.depth_limit {
            cur = self.forward(cur, depth)?;
            depth += 1;
        }
        self.stats.per_rollout.push(RolloutStat {
            depth,
            terminal: self.arena.get(cur).terminal,
        });

        // Backpropagation: father.q never decreases.
        let mut child = cur;
        while let Some(father) = self.arena.get(child).father {
            let v = self.cfg.lambda * (self.arena.get(child).q + self.arena.get(child).r);
            let f = self.arena.get_mut(father);
            if v > f.q {
                f.q = v;
            }
            child = father;
        }
        Ok(())
    }

    /// Selection + expansion: pick the argmax child of `cur` by
    /// `r + q + u`, `u = p * sqrt(father.visited / (child.visited + 1))`,
    /// realize its action, and return it.
    ///
    /// Exact value ties break toward the lowest child index.
    fn forward(&mut self, cur: StateId, depth: u32) -> Result<StateId, MctsError<A::Error>> {
        let children: Vec<StateId> = self.arena.get(cur).children.clone();
        debug_assert!(!children.is_empty(), "forward from an unexpanded state");
        let father_visited = self.arena.get(cur).visited as f64;

        let mut best_idx = 0usize;
        let mut best_value = f64::NEG_INFINITY;
        for (idx, &cid) in children.iter().enumerate() {
            let ch = self.arena.get(cid);
            let u = ch.p * (father_visited / (ch.visited as f64 + 1.0)).sqrt();
            let value = ch.r + ch.q + u;
            if value > best_value {
                best_value = value;
                best_idx = idx;
            }
        }
        let chosen = children[best_idx];

        let first_visit = self.arena.get(chosen).visited == 0;
        if first_visit && !self.arena.get(chosen).is_expanded() {
            self.expand(chosen);
        }

        let reward = self
            .adapter
            .take_action(best_idx, depth)
            .map_err(MctsError::Adapter)?;
        self.stats.steps += 1;

        let father_reward = self.arena.get(cur).reward;
        let diff = father_reward - reward;
        // A reward decrease (improvement) yields a positive one-step term.
        let r = if diff == 0.0 {
            0.0
        } else {
            diff.signum() * (diff.abs() / self.baseline).sqrt()
        };

        let mul_reward = self.adapter.mul_reward();
        {
            let st = self.arena.get_mut(chosen);
            st.reward = reward;
            st.mul_reward = mul_reward;
            st.r = r;
        }

        // New-reward discovery: record-best callbacks fire on first visit
        // only, never on revisits.
        if first_visit {
            if reward < self.best_reward {
                self.best_reward = reward;
                self.adapter.record_best();
            }
            if mul_reward < self.best_mul_reward {
                self.best_mul_reward = mul_reward;
                self.adapter.record_mul_best();
            }
        }

        let terminal = self.adapter.terminal();
        let st = self.arena.get_mut(chosen);
        st.terminal = terminal;
        st.visited += 1;

        Ok(chosen)
    }

    /// Allocate the fixed-arity child list of `id` with noised priors and
    /// register every child in the position map.
    fn expand(&mut self, id: StateId) {
        debug_assert!(self.arena.get(id).children.is_empty());
        let arity = self.adapter.action_count();
        let priors: Vec<f64> = (0..arity)
            .map(|_| {
                let noise: f64 = self.rng.sample(StandardNormal);
                self.cfg.puct * (0.98 / arity as f64 + 0.02 * noise)
            })
            .collect();

        for cid in self.arena.alloc_children(id, &priors) {
            let prev = self.positions.insert(self.arena.get(cid).position.clone(), cid);
            assert!(prev.is_none(), "position key registered twice");
        }
        self.stats.expansions += 1;
        self.stats.node_count = self.arena.len();
    }
}
