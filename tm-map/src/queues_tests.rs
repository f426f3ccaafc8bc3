use crate::queues::CandidateQueues;
use tm_core::candidate::{Candidate, Metric};

fn cand(node: usize, area: f64, delay: f64) -> Candidate {
    Candidate {
        node,
        phase: 0,
        cut: 0,
        supergate: 0,
        area,
        delay,
        wirelength: -(node as f64),
        total_wirelength: -(node as f64) * 2.0,
    }
}

fn ten_candidates() -> Vec<Candidate> {
    // Area gains -1..-10 (node 0 best), delay gains -10..-1 (node 9 best).
    (0..10)
        .map(|n| cand(n, -(n as f64 + 1.0), -(10.0 - n as f64)))
        .collect()
}

#[test]
fn take_top_percent_obeys_the_count_law() {
    let mut q = CandidateQueues::build(&ten_candidates());
    assert_eq!(q.original_len(Metric::Area), 10);

    let first = q.take_top_percent(Metric::Area, 0.3);
    assert_eq!(first.len(), 3);
    assert_eq!(q.len(Metric::Area), 7);

    let second = q.take_top_percent(Metric::Area, 0.3);
    assert_eq!(second.len(), 3);
    assert_eq!(q.len(Metric::Area), 4);

    // The count is anchored to the original size, clamped to what's left.
    let rest = q.take_top_percent(Metric::Area, 1.0);
    assert_eq!(rest.len(), 4);
    assert!(q.is_empty(Metric::Area));
    assert_eq!(q.take_top_percent(Metric::Area, 1.0).len(), 0);
}

#[test]
fn extraction_is_strictly_from_the_metric_maximal_tail() {
    let mut q = CandidateQueues::build(&ten_candidates());

    // Best area gains are the least negative: nodes 0, 1, 2.
    let by_area = q.take_top_percent(Metric::Area, 0.3);
    let nodes: Vec<usize> = by_area.iter().map(|c| c.node).collect();
    assert_eq!(nodes, vec![0, 1, 2]);

    // Best delay gains sit at the other end: nodes 9, 8, 7.
    let by_delay = q.take_top_percent(Metric::Delay, 0.3);
    let nodes: Vec<usize> = by_delay.iter().map(|c| c.node).collect();
    assert_eq!(nodes, vec![9, 8, 7]);
}

#[test]
fn extraction_leaves_other_queues_untouched() {
    let mut q = CandidateQueues::build(&ten_candidates());
    q.take_top_percent(Metric::Area, 0.5);
    assert_eq!(q.len(Metric::Area), 5);
    assert_eq!(q.len(Metric::Delay), 10);
    assert_eq!(q.len(Metric::Wirelength), 10);
    assert_eq!(q.len(Metric::TotalWirelength), 10);
}

#[test]
fn ties_fall_back_to_secondary_then_node_index() {
    // Same area gain everywhere; delay (the area queue's secondary)
    // separates nodes 0 and 1, node index separates nodes 2 and 3.
    let cands = vec![
        cand(0, -1.0, -5.0),
        cand(1, -1.0, -2.0),
        cand(2, -1.0, -3.0),
        cand(3, -1.0, -3.0),
    ];
    let mut q = CandidateQueues::build(&cands);
    let all = q.take_top_percent(Metric::Area, 1.0);
    let nodes: Vec<usize> = all.iter().map(|c| c.node).collect();
    // Tail order: best secondary (least negative delay) first, and for
    // equal secondaries the larger node index sits later in the set.
    assert_eq!(nodes, vec![1, 3, 2, 0]);
}

#[test]
fn fraction_floor_can_select_nothing() {
    let mut q = CandidateQueues::build(&ten_candidates());
    assert_eq!(q.take_top_percent(Metric::Wirelength, 0.05).len(), 0);
    assert_eq!(q.len(Metric::Wirelength), 10);
}
