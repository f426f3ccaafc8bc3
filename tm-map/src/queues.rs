//! Four metric-ordered candidate queues with bounded tail extraction.
//!
//! Candidates store gain (negative cost), so the best entries sit at the
//! ascending tail of each set. Ordering is total: primary metric, a fixed
//! secondary metric, then node index and identity fields, so no ties
//! survive and extraction order is deterministic.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tm_core::candidate::{Candidate, Metric, ACTIONS};

/// Fixed secondary sort metric per queue.
fn secondary_of(metric: Metric) -> Metric {
    match metric {
        Metric::Delay => Metric::Area,
        Metric::Area => Metric::Delay,
        Metric::Wirelength => Metric::TotalWirelength,
        Metric::TotalWirelength => Metric::Wirelength,
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    primary: f64,
    secondary: f64,
    cand: Candidate,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.primary
            .total_cmp(&other.primary)
            .then_with(|| self.secondary.total_cmp(&other.secondary))
            .then_with(|| self.cand.node.cmp(&other.cand.node))
            .then_with(|| self.cand.phase.cmp(&other.cand.phase))
            .then_with(|| self.cand.cut.cmp(&other.cand.cut))
            .then_with(|| self.cand.supergate.cmp(&other.cand.supergate))
    }
}

/// The whole network's currently-available candidates, ordered
/// independently by each objective.
#[derive(Debug, Default)]
pub struct CandidateQueues {
    sets: [BTreeSet<Entry>; ACTIONS],
    /// Sizes at build time; the extraction count law is anchored here.
    original: [usize; ACTIONS],
}

impl CandidateQueues {
    pub fn build(candidates: &[Candidate]) -> Self {
        let mut sets: [BTreeSet<Entry>; ACTIONS] = Default::default();
        for (i, metric) in Metric::ALL.iter().enumerate() {
            let secondary = secondary_of(*metric);
            for &cand in candidates {
                let inserted = sets[i].insert(Entry {
                    primary: cand.gain(*metric),
                    secondary: cand.gain(secondary),
                    cand,
                });
                debug_assert!(
                    inserted,
                    "duplicate candidate ({}, {}, {}, {})",
                    cand.node, cand.phase, cand.cut, cand.supergate
                );
            }
        }
        let original = [
            sets[0].len(),
            sets[1].len(),
            sets[2].len(),
            sets[3].len(),
        ];
        Self { sets, original }
    }

    pub fn len(&self, metric: Metric) -> usize {
        self.sets[metric.index()].len()
    }

    pub fn is_empty(&self, metric: Metric) -> bool {
        self.sets[metric.index()].is_empty()
    }

    pub fn original_len(&self, metric: Metric) -> usize {
        self.original[metric.index()]
    }

    /// Destructively extract `min(floor(original * fraction), len)`
    /// candidates from the ascending tail (the best entries), best first.
    ///
    /// Extracted entries leave this queue for the remainder of the search
    /// step; the other three queues are untouched.
    pub fn take_top_percent(&mut self, metric: Metric, fraction: f64) -> Vec<Candidate> {
        let idx = metric.index();
        let count = ((self.original[idx] as f64 * fraction) as usize).min(self.sets[idx].len());
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            match self.sets[idx].pop_last() {
                Some(e) => out.push(e.cand),
                None => break,
            }
        }
        out
    }
}
