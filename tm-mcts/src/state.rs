//! Search-tree state records.

pub type StateId = u32;

/// Path of action indices from the root; deduplicates expansions.
pub type PathKey = Vec<u8>;

/// One node of the search tree.
///
/// Children are allocated lazily on first visit (fixed arity = the
/// adapter's action count) and stored as arena ids; the father link is an
/// id as well, `None` only for the root.
#[derive(Debug, Clone)]
pub struct State {
    /// Backed-up value (monotonic max-update).
    pub q: f64,
    /// Prior / exploration weight, noised at creation.
    pub p: f64,
    /// One-step reward term from the father's point of view.
    pub r: f64,
    /// Raw adapter reward observed when this state was realized.
    pub reward: f64,
    /// Combined delay-area reward observed at the same time.
    pub mul_reward: f64,
    pub visited: u32,
    pub terminal: bool,
    pub children: Vec<StateId>,
    pub father: Option<StateId>,
    /// Action that led here from the father; unused for the root.
    pub action: usize,
    pub position: PathKey,
}

impl State {
    pub fn new(father: Option<StateId>, action: usize, p: f64, position: PathKey) -> Self {
        Self {
            q: 0.0,
            p,
            r: 0.0,
            reward: 0.0,
            mul_reward: 0.0,
            visited: 0,
            terminal: false,
            children: Vec::new(),
            father,
            action,
            position,
        }
    }

    pub fn is_root(&self) -> bool {
        self.father.is_none()
    }

    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }
}
